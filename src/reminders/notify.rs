use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::ReminderNotifier;
use crate::flow::Partners;
use crate::llm::UNTITLED;
use crate::storage::Task;
use crate::telegram::{Messenger, TextFormat, escape_markdown_v2};

/// MarkdownV2 body of a reminder.
#[must_use]
pub fn reminder_text(task: &Task) -> String {
    let title = if task.title.trim().is_empty() {
        UNTITLED
    } else {
        task.title.as_str()
    };
    format!(
        "{}\n\n*{}*\n{}: {}\n{}: {}\n\n{}",
        escape_markdown_v2("⏰ Напоминание по проекту"),
        escape_markdown_v2(title),
        escape_markdown_v2("Статус"),
        escape_markdown_v2(task.status.label()),
        escape_markdown_v2("Создан"),
        escape_markdown_v2(&task.created_display()),
        escape_markdown_v2("Нужно обработать проект и продвинуть статус."),
    )
}

/// Sends reminders to both partners.
pub struct PartnerReminder {
    messenger: Arc<dyn Messenger>,
    partners: Partners,
}

impl PartnerReminder {
    #[must_use]
    pub fn new(messenger: Arc<dyn Messenger>, partners: Partners) -> Self {
        Self {
            messenger,
            partners,
        }
    }
}

#[async_trait]
impl ReminderNotifier for PartnerReminder {
    async fn remind(&self, task: &Task) {
        let text = reminder_text(task);
        for partner in self.partners.both() {
            match self
                .messenger
                .send_text(partner, &text, TextFormat::MarkdownV2, None)
                .await
            {
                Ok(_) => info!("Reminder sent to partner {} for task {}", partner, task.id),
                Err(e) => warn!("Reminder to partner {} for task {} failed: {}", partner, task.id, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::storage::ProjectStatus;
    use crate::testing::FakeMessenger;

    fn task(title: &str) -> Task {
        let created = Utc.with_ymd_and_hms(2025, 5, 1, 9, 30, 0).unwrap();
        Task {
            id: 5,
            title: title.to_owned(),
            status: ProjectStatus::New,
            creator_id: Some(1),
            brief: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_reminder_text_is_escaped() {
        let text = reminder_text(&task("Бот v2.0 (MVP)"));
        assert!(text.starts_with("⏰ Напоминание по проекту\n\n*Бот v2\\.0 \\(MVP\\)*"));
        assert!(text.contains("Статус: новый"));
        assert!(text.contains("Создан: 01\\.05\\.2025 12:30"));
        assert!(text.ends_with("продвинуть статус\\."));
    }

    #[test]
    fn test_blank_title_falls_back() {
        assert!(reminder_text(&task("  ")).contains("*Без названия*"));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_other() {
        let messenger = Arc::new(FakeMessenger::default());
        messenger.fail_for(10);
        let reminder = PartnerReminder::new(
            messenger.clone(),
            Partners {
                business: 10,
                team: 20,
                admins: vec![10, 20],
            },
        );

        reminder.remind(&task("Бот")).await;

        let sent = messenger.texts_to(20);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Напоминание"));
        assert!(messenger.texts_to(10).is_empty());
    }
}
