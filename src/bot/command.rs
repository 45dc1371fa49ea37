//! Commands and inline-button actions.

use std::fmt;

/// Label of the persistent reply-keyboard button that opens the project list.
pub const PROJECTS_BUTTON: &str = "📁 Проекты";

/// Text commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Register the operator and start a fresh draft.
    Start,

    /// Drop the current draft and start over.
    New,

    /// Browse projects, newest first.
    Projects,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Accepts `/cmd`, `/cmd@botname` and the projects button label.
    /// Returns `None` if the message is not a command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == PROJECTS_BUTTON {
            return Some(Self::Projects);
        }

        let after_slash = text.strip_prefix('/')?;
        let word = after_slash
            .split_whitespace()
            .next()
            .unwrap_or_default();
        let name = word.split_once('@').map_or(word, |(name, _)| name);

        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "new" => Some(Self::New),
            "projects" => Some(Self::Projects),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "/start"),
            Self::New => write!(f, "/new"),
            Self::Projects => write!(f, "/projects"),
            Self::Help => write!(f, "/help"),
        }
    }
}

/// Payload of an inline button.
///
/// Encoded as colon-delimited tokens that fit the 64-byte callback limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    SendProject,
    ClearDraft,
    ApprovePost,
    RegeneratePost,
    CancelReview,

    /// Show the project before position `index`.
    Previous(i64),
    /// Show the project after position `index`.
    Next(i64),
    /// Redraw position `index` with navigation controls.
    Back(i64),
    /// The position counter; does nothing.
    Noop,

    /// Offer the status choices for a project shown at `index`.
    StatusMenu { task_id: i64, index: i64 },
    /// Apply a status chosen from the menu.
    SetStatus { task_id: i64, index: i64, key: String },

    /// Open a project card by id.
    Open(i64),
}

impl CallbackAction {
    /// Parses callback data. Returns `None` for anything unrecognized.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split(':').collect();
        match parts.as_slice() {
            ["send_project"] => Some(Self::SendProject),
            ["clear_draft"] => Some(Self::ClearDraft),
            ["approve_post"] => Some(Self::ApprovePost),
            ["regen_post"] => Some(Self::RegeneratePost),
            ["cancel_review"] => Some(Self::CancelReview),
            ["proj_nav", "nop"] => Some(Self::Noop),
            ["proj_nav", "prev", index] => index.parse().ok().map(Self::Previous),
            ["proj_nav", "next", index] => index.parse().ok().map(Self::Next),
            ["proj_nav", "back", index] => index.parse().ok().map(Self::Back),
            ["proj_nav", "status", task_id, index] => Some(Self::StatusMenu {
                task_id: task_id.parse().ok()?,
                index: index.parse().ok()?,
            }),
            ["proj_set_status", task_id, index, key] if !key.is_empty() => Some(Self::SetStatus {
                task_id: task_id.parse().ok()?,
                index: index.parse().ok()?,
                key: (*key).to_owned(),
            }),
            ["proj_open", task_id] => task_id.parse().ok().map(Self::Open),
            _ => None,
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendProject => write!(f, "send_project"),
            Self::ClearDraft => write!(f, "clear_draft"),
            Self::ApprovePost => write!(f, "approve_post"),
            Self::RegeneratePost => write!(f, "regen_post"),
            Self::CancelReview => write!(f, "cancel_review"),
            Self::Previous(i) => write!(f, "proj_nav:prev:{i}"),
            Self::Next(i) => write!(f, "proj_nav:next:{i}"),
            Self::Back(i) => write!(f, "proj_nav:back:{i}"),
            Self::Noop => write!(f, "proj_nav:nop"),
            Self::StatusMenu { task_id, index } => write!(f, "proj_nav:status:{task_id}:{index}"),
            Self::SetStatus {
                task_id,
                index,
                key,
            } => write!(f, "proj_set_status:{task_id}:{index}:{key}"),
            Self::Open(task_id) => write!(f, "proj_open:{task_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/new@brief_bot"), Some(BotCommand::New));
        assert_eq!(BotCommand::parse("  /Projects "), Some(BotCommand::Projects));
        assert_eq!(BotCommand::parse("/help me"), Some(BotCommand::Help));
        assert_eq!(BotCommand::parse("📁 Проекты"), Some(BotCommand::Projects));
    }

    #[test]
    fn test_parse_non_commands() {
        assert_eq!(BotCommand::parse("Нужен бот"), None);
        assert_eq!(BotCommand::parse("/unknown"), None);
        assert_eq!(BotCommand::parse("/"), None);
        assert_eq!(BotCommand::parse("start"), None);
    }

    #[test]
    fn test_parse_callbacks() {
        assert_eq!(CallbackAction::parse("send_project"), Some(CallbackAction::SendProject));
        assert_eq!(CallbackAction::parse("proj_nav:prev:0"), Some(CallbackAction::Previous(0)));
        assert_eq!(CallbackAction::parse("proj_nav:next:-1"), Some(CallbackAction::Next(-1)));
        assert_eq!(
            CallbackAction::parse("proj_nav:status:12:3"),
            Some(CallbackAction::StatusMenu { task_id: 12, index: 3 })
        );
        assert_eq!(
            CallbackAction::parse("proj_set_status:12:3:in_dev"),
            Some(CallbackAction::SetStatus {
                task_id: 12,
                index: 3,
                key: "in_dev".to_owned()
            })
        );
        assert_eq!(CallbackAction::parse("proj_open:7"), Some(CallbackAction::Open(7)));
    }

    #[test]
    fn test_parse_rejects_malformed_callbacks() {
        assert_eq!(CallbackAction::parse("proj_nav:prev:x"), None);
        assert_eq!(CallbackAction::parse("proj_nav:status:1"), None);
        assert_eq!(CallbackAction::parse("proj_set_status:1:2:"), None);
        assert_eq!(CallbackAction::parse("approve_post:1"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }

    #[test]
    fn test_display_matches_parse() {
        for action in [
            CallbackAction::ClearDraft,
            CallbackAction::Back(4),
            CallbackAction::Noop,
            CallbackAction::StatusMenu { task_id: 9, index: 0 },
            CallbackAction::SetStatus {
                task_id: 9,
                index: 0,
                key: "done".to_owned(),
            },
            CallbackAction::Open(1),
        ] {
            assert_eq!(CallbackAction::parse(&action.to_string()), Some(action));
        }
    }
}
