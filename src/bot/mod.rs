//! Bot surface: commands, callbacks, keyboards and the update handler.

mod access;
pub mod command;
mod content;
mod handler;
pub mod keyboards;
pub mod texts;

use thiserror::Error;

use crate::flow::FlowError;
use crate::storage::StoreError;
use crate::telegram::TelegramError;

pub use access::AccessGuard;
pub use command::{BotCommand, CallbackAction, PROJECTS_BUTTON};
pub use content::fragments;
pub use handler::UpdateHandler;

/// Errors that abort handling of one update.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Flow(#[from] FlowError),
}
