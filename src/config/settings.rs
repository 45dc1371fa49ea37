//! Application settings loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

/// Telegram Bot API configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by `@BotFather`.
    pub bot_token: String,

    /// Base URL of the Bot API server.
    pub api_url: String,

    /// Long-polling timeout for `getUpdates`, in seconds.
    pub poll_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_owned()
}

fn default_poll_timeout() -> u64 {
    30
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN` to be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = required("BOT_TOKEN")?;
        let api_url = std::env::var("TG_API_URL").unwrap_or_else(|_| default_api_url());
        let poll_timeout_secs = optional_parsed("TG_POLL_TIMEOUT")?.unwrap_or_else(default_poll_timeout);

        Ok(Self {
            bot_token,
            api_url,
            poll_timeout_secs,
        })
    }
}

/// Generative-service configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key for the OpenAI-compatible endpoint.
    pub api_key: String,

    /// Model name passed with every request.
    pub model: String,

    /// Base URL of the endpoint (without `/chat/completions`).
    pub base_url: String,

    /// Client-side request timeout in seconds.
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

fn default_llm_timeout() -> u64 {
    120
}

impl LlmConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `CHAT_GPT_API_KEY` and `CHAT_GPT_MODEL` to be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required("CHAT_GPT_API_KEY")?,
            model: required("CHAT_GPT_MODEL")?,
            base_url: std::env::var("CHAT_GPT_BASE_URL").unwrap_or_else(|_| default_llm_base_url()),
            timeout_secs: optional_parsed("CHAT_GPT_TIMEOUT_SECS")?.unwrap_or_else(default_llm_timeout),
        })
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Who may talk to the bot and who gets notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Operators allowed to use the bot.
    pub admin_ids: Vec<i64>,

    /// The business-side partner.
    pub business_partner_id: i64,

    /// The team-side partner.
    pub team_partner_id: i64,
}

impl AccessConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `ADMIN_IDS`, `BUSINESS_PARTNER_ID` and `TEAM_PARTNER_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let admin_ids = parse_id_list(&required("ADMIN_IDS")?).map_err(|reason| ConfigError::InvalidValue {
            var: "ADMIN_IDS",
            reason,
        })?;

        Ok(Self {
            admin_ids,
            business_partner_id: required_parsed("BUSINESS_PARTNER_ID")?,
            team_partner_id: required_parsed("TEAM_PARTNER_ID")?,
        })
    }
}

/// Bot behaviour settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Connection string of the task database.
    pub database_url: String,

    /// Delay between reminders for tasks still in the initial status.
    pub reminder_delay_secs: u64,

    /// Whether approval also produces a commercial proposal document.
    pub proposal_enabled: bool,

    /// Directory for temporary proposal artifacts.
    pub proposal_dir: PathBuf,

    /// Whether to try converting proposals to PDF.
    pub convert_pdf: bool,

    /// Office binary used for PDF conversion.
    pub soffice_bin: String,

    /// Minimum gap between outbound Bot API calls, in milliseconds.
    pub min_send_interval_ms: u64,
}

fn default_reminder_delay() -> u64 {
    7200 // two hours
}

fn default_kp_enabled() -> bool {
    true
}

fn default_kp_dir() -> PathBuf {
    PathBuf::from("generated_kp")
}

fn default_soffice() -> String {
    "soffice".to_owned()
}

fn default_send_interval() -> u64 {
    40
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:///db.sqlite3".to_owned(),
            reminder_delay_secs: default_reminder_delay(),
            proposal_enabled: default_kp_enabled(),
            proposal_dir: default_kp_dir(),
            convert_pdf: false,
            soffice_bin: default_soffice(),
            min_send_interval_ms: default_send_interval(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    ///
    /// Only `DB_URL` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DB_URL")?,
            reminder_delay_secs: optional_parsed("REMINDER_DELAY_SECONDS_NEW")?
                .unwrap_or_else(default_reminder_delay),
            proposal_enabled: optional_flag("KP_ENABLED")?.unwrap_or_else(default_kp_enabled),
            proposal_dir: std::env::var("KP_OUTPUT_DIR").map_or_else(|_| default_kp_dir(), PathBuf::from),
            convert_pdf: optional_flag("KP_CONVERT_PDF")?.unwrap_or(false),
            soffice_bin: std::env::var("SOFFICE_BIN").unwrap_or_else(|_| default_soffice()),
            min_send_interval_ms: optional_parsed("TG_MIN_SEND_INTERVAL_MS")?
                .unwrap_or_else(default_send_interval),
        })
    }

    /// Returns the reminder delay.
    #[must_use]
    pub const fn reminder_delay(&self) -> Duration {
        Duration::from_secs(self.reminder_delay_secs)
    }
}

/// Everything the bot process needs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub access: AccessConfig,
    pub bot: BotSettings,
}

impl AppConfig {
    /// Loads the complete configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            telegram: TelegramConfig::from_env()?,
            llm: LlmConfig::from_env()?,
            access: AccessConfig::from_env()?,
            bot: BotSettings::from_env()?,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => Err(ConfigError::MissingEnvVar(var)),
    }
}

fn required_parsed<T>(var: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    required(var)?.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
    })
}

fn optional_parsed<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

fn optional_flag(var: &'static str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_flag(&value).map(Some).ok_or_else(|| {
            ConfigError::InvalidValue {
                var,
                reason: format!("expected a boolean, got '{value}'"),
            }
        }),
        _ => Ok(None),
    }
}

/// Parses a boolean flag in the spellings people put in `.env` files.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses an id list given either as `1,2,3` or as a JSON array `[1, 2, 3]`.
pub(crate) fn parse_id_list(value: &str) -> Result<Vec<i64>, String> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| e.to_string());
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|e| format!("'{s}': {e}")))
        .collect()
}
