//! Inline and reply keyboards.

use super::command::{CallbackAction, PROJECTS_BUTTON};
use crate::storage::ProjectStatus;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup};

fn button(text: &str, action: &CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_string())
}

/// Controls under a draft being collected.
#[must_use]
pub fn draft_actions() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🚀 Отправить проект", &CallbackAction::SendProject)],
        vec![button("🧹 Очистить", &CallbackAction::ClearDraft)],
    ])
}

/// Controls under a generated post awaiting review.
#[must_use]
pub fn review_actions() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("✅ Одобрить", &CallbackAction::ApprovePost)],
        vec![button("🔁 Перегенерировать", &CallbackAction::RegeneratePost)],
        vec![button("❌ Отмена", &CallbackAction::CancelReview)],
    ])
}

/// The always-visible button that opens the project list.
#[must_use]
pub fn projects_reply_keyboard() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup {
        keyboard: vec![vec![KeyboardButton {
            text: PROJECTS_BUTTON.to_owned(),
        }]],
        resize_keyboard: true,
        is_persistent: true,
    }
}

/// Navigation under a project card at position `index` of `total`.
#[must_use]
pub fn project_nav(task_id: i64, index: u64, total: u64) -> InlineKeyboardMarkup {
    let index = i64::try_from(index).unwrap_or_default();
    InlineKeyboardMarkup::new(vec![
        vec![
            button("◀️", &CallbackAction::Previous(index)),
            button(&format!("{}/{total}", index + 1), &CallbackAction::Noop),
            button("▶️", &CallbackAction::Next(index)),
        ],
        vec![button(
            "🔄 Изменить статус",
            &CallbackAction::StatusMenu { task_id, index },
        )],
    ])
}

/// One button per status, plus a way back to the card.
#[must_use]
pub fn status_choice(task_id: i64, index: i64) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = ProjectStatus::ALL
        .iter()
        .map(|status| {
            vec![button(
                status.label(),
                &CallbackAction::SetStatus {
                    task_id,
                    index,
                    key: status.key().to_owned(),
                },
            )]
        })
        .collect();
    rows.push(vec![button("⬅️ Назад", &CallbackAction::Back(index))]);
    InlineKeyboardMarkup::new(rows)
}

/// Single button opening a project card.
#[must_use]
pub fn open_project(task_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "📁 Открыть проект",
        &CallbackAction::Open(task_id),
    )]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_button_parses_back() {
        let keyboards = [
            draft_actions(),
            review_actions(),
            project_nav(42, 2, 5),
            status_choice(42, 2),
            open_project(42),
        ];
        for data in keyboards.iter().flat_map(|kb| kb.callback_data()) {
            assert!(CallbackAction::parse(data).is_some(), "unparsable {data}");
            assert!(data.len() <= 64, "too long {data}");
        }
    }

    #[test]
    fn test_nav_counter_is_one_based() {
        let kb = project_nav(1, 0, 3);
        assert_eq!(kb.inline_keyboard[0][1].text, "1/3");
        assert_eq!(kb.inline_keyboard[0][0].callback_data, "proj_nav:prev:0");
    }

    #[test]
    fn test_status_choice_lists_all_statuses() {
        let kb = status_choice(5, 1);
        assert_eq!(kb.inline_keyboard.len(), ProjectStatus::ALL.len() + 1);
        assert_eq!(kb.inline_keyboard[0][0].callback_data, "proj_set_status:5:1:new");
        assert_eq!(kb.inline_keyboard.last().unwrap()[0].callback_data, "proj_nav:back:1");
    }
}
