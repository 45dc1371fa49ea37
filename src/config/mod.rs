//! Configuration module for the brief bot.
//!
//! Handles loading and validation of the bot configuration: Bot API
//! credentials, the operator allow-list, the two partners, the generative
//! service and the task database.

mod settings;

pub use settings::{AccessConfig, AppConfig, BotSettings, ConfigError, LlmConfig, TelegramConfig};

/// Maximum length of a task title, in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Safe size of one outgoing text chunk (the platform limit is 4096).
pub const MESSAGE_CHUNK_LIMIT: usize = 3500;
