//! Telegram Bot API module.
//!
//! Provides the HTTP client, wire types, outbound pacing and the
//! [`Messenger`] seam through which every outgoing message travels.

mod client;
mod format;
mod rate_limiter;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

pub use client::{TelegramBot, TelegramError};
pub use format::{escape_markdown_v2, split_message};
pub(crate) use format::truncate_for_log;
pub use rate_limiter::RateLimiter;
pub use types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, Message,
    MessageRef, ReplyKeyboardMarkup, ReplyMarkup, TextFormat, Update, User,
};

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a new text message.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef, TelegramError>;

    /// Replaces the text (and inline keyboard) of an existing message.
    async fn edit_text(
        &self,
        target: MessageRef,
        text: &str,
        format: TextFormat,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError>;

    /// Replaces only the inline keyboard of an existing message.
    async fn edit_markup(
        &self,
        target: MessageRef,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), TelegramError>;

    /// Acknowledges a button press, optionally with a toast or alert.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TelegramError>;

    /// Uploads a file as a document.
    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TelegramError>;
}
