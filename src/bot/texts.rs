//! Operator-facing texts.
//!
//! Functions returning MarkdownV2 say so; everything else is plain text.

use crate::llm::LlmError;
use crate::storage::Task;
use crate::telegram::escape_markdown_v2 as esc;

pub const WELCOME: &str = "Привет! Я помогу быстро создавать:\n\
• пост для TG-канала по брифу клиента,\n\
• коммерческое предложение в формате документа.\n\n\
Скинь подряд все сообщения/файлы от клиента, затем нажми «Отправить проект».";

pub const HELP: &str = "Как пользоваться:\n\
1. Перешли боту сообщения и файлы клиента.\n\
2. Нажми «🚀 Отправить проект» — я сгенерирую пост и заведу проект.\n\
3. Одобри, перегенерируй или отмени результат.\n\n\
Команды:\n\
/new — начать новый черновик\n\
/projects или «📁 Проекты» — список проектов и смена статуса\n\
/help — эта справка";

pub const DENIED: &str = "⛔ Доступ запрещён.";
pub const NEW_DRAFT: &str = "Ок, начнём новый черновик. Скинь материалы, затем нажми «Отправить проект».";
pub const ADDED: &str = "Добавил в черновик. Жми «Отправить проект», когда готово.";
pub const UNDER_REVIEW: &str =
    "Сейчас на проверке сгенерированный пост. Одобри, перегенерируй или отмени его, потом продолжим.";
pub const NOT_REVIEWING: &str = "Нет поста на проверке.";
pub const CLEARED: &str = "Черновик очищен. Пришли материалы заново.";
pub const GENERATING: &str = "Генерирую пост, секунду…";
pub const REGENERATING: &str = "Перегенерирую…";
pub const CANCELLED: &str = "Отменил. Чтобы начать заново — пришли материалы или /new.";
pub const PREPARING_PROPOSAL: &str = "Готовлю коммерческое предложение…";
pub const EMPTY_LIST: &str = "Список проектов пуст.";
pub const LOAD_FAILED: &str = "Не удалось загрузить проект.";

/// Explains a failed generation (plain text).
///
/// A malformed answer is worth retrying at once; a transport failure usually is not.
#[must_use]
pub fn generation_failed(err: &LlmError) -> String {
    if err.is_malformed_answer() {
        format!("Не получилось сгенерировать пост: модель ответила не по формату ({err}).\nПопробуй ещё раз.")
    } else {
        format!("Не получилось сгенерировать пост: сервис генерации недоступен ({err}).\nПопробуй позже.")
    }
}

/// Review preview (MarkdownV2).
#[must_use]
pub fn preview(title: &str, body: &str) -> String {
    format!(
        "{} \\({}: *{}*\\):\n\n{}",
        esc("Предпросмотр поста"),
        esc("название задачи"),
        esc(title),
        esc(body)
    )
}

/// Preview after regeneration (MarkdownV2).
#[must_use]
pub fn regenerated(title: &str, body: &str) -> String {
    format!(
        "{} \\({}: *{}*\\):\n\n{}",
        esc("Новая версия"),
        esc("название задачи"),
        esc(title),
        esc(body)
    )
}

/// Confirmation of an approved post (MarkdownV2).
#[must_use]
pub fn approved(title: &str, body: &str) -> String {
    format!(
        "{}\n\n{}: *{}*\n\n{}:\n{}",
        esc("✅ Одобрено и сохранено."),
        esc("Название"),
        esc(title),
        esc("Пост"),
        esc(body)
    )
}

/// Message for the counterparts of an approved project (plain text).
#[must_use]
pub fn new_project(author: &str, title: &str, brief: &str, body: &str) -> String {
    format!("🆕 Новый проект от {author}\n\nНазвание: {title}\n\nБриф клиента:\n{brief}\n\nПост:\n{body}")
}

/// Project card (MarkdownV2). `index` is zero-based.
#[must_use]
pub fn project_card(task: &Task, index: u64, total: u64) -> String {
    format!(
        "{}\n\n*{}*\n{}: {}\n{}: {}\n{}: {}/{}",
        esc("📁 Проект"),
        esc(&task.title),
        esc("Статус"),
        esc(task.status.label()),
        esc("Создан"),
        esc(&task.created_display()),
        esc("Позиция"),
        index + 1,
        total
    )
}

/// Status change notice for the counterparts (MarkdownV2).
#[must_use]
pub fn status_changed(task: &Task) -> String {
    format!(
        "{}\n\n*{}*\n{}: {}\n{}: {}",
        esc("🔔 Изменён статус проекта"),
        esc(&task.title),
        esc("Статус"),
        esc(task.status.label()),
        esc("Создан"),
        esc(&task.created_display()),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::storage::ProjectStatus;

    #[test]
    fn test_generation_failed_depends_on_cause() {
        let malformed = generation_failed(&LlmError::MissingJson);
        assert!(malformed.contains("не по формату"));
        assert!(malformed.ends_with("Попробуй ещё раз."));

        let down = generation_failed(&LlmError::Api {
            status: 503,
            message: "overloaded".to_owned(),
        });
        assert!(down.contains("сервис генерации недоступен"));
        assert!(down.contains("503"));
    }

    #[test]
    fn test_preview_escapes_user_text() {
        let text = preview("Бот (v2)", "Цена: 100.");
        assert_eq!(
            text,
            "Предпросмотр поста \\(название задачи: *Бот \\(v2\\)*\\):\n\nЦена: 100\\."
        );
    }

    #[test]
    fn test_project_card() {
        let created = Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap();
        let task = Task {
            id: 3,
            title: "CRM-интеграция".to_owned(),
            status: ProjectStatus::InDevelopment,
            creator_id: None,
            brief: None,
            created_at: created,
            updated_at: created,
        };
        assert_eq!(
            project_card(&task, 1, 4),
            "📁 Проект\n\n*CRM\\-интеграция*\nСтатус: в разработке\nСоздан: 01\\.06\\.2025 10:00\nПозиция: 2/4"
        );
    }
}
