//! Bot API client over HTTPS.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::format::truncate_for_log;
use super::types::{
    ApiResponse, InlineKeyboardMarkup, Message, MessageRef, ReplyMarkup, TextFormat, Update,
};
use super::{Messenger, RateLimiter};
use crate::config::TelegramConfig;

/// Errors that can occur during Bot API operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read attachment: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected Bot API answer: {0}")]
    Decode(String),
}

impl TelegramError {
    /// Whether the error only says the message already looks like that.
    ///
    /// Editing a message to identical content is rejected by the API; callers
    /// treat it as success.
    #[must_use]
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct EditMessageReplyMarkup<'a> {
    chat_id: i64,
    message_id: i64,
    reply_markup: &'a InlineKeyboardMarkup,
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    show_alert: bool,
}

/// High-level Bot API client.
pub struct TelegramBot {
    http: reqwest::Client,
    base: String,
    poll_timeout_secs: u64,
    rate_limiter: RateLimiter,
}

impl TelegramBot {
    /// Creates a client for the configured bot.
    pub fn new(config: &TelegramConfig, min_send_interval_ms: u64) -> Result<Self, TelegramError> {
        // The long-poll must be allowed to outlive its own timeout.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 30))
            .build()?;

        Ok(Self {
            http,
            base: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            poll_timeout_secs: config.poll_timeout_secs,
            rate_limiter: RateLimiter::from_millis(min_send_interval_ms),
        })
    }

    /// Checks the token and returns the bot's username.
    pub async fn get_me(&self) -> Result<String, TelegramError> {
        #[derive(serde::Deserialize)]
        struct Me {
            username: Option<String>,
        }

        let me: Me = self.call("getMe", &serde_json::json!({})).await?;
        let username = me.username.unwrap_or_default();
        info!("Connected to Bot API as @{}", username);
        Ok(username)
    }

    /// Long-polls for updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdates {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: &["message", "callback_query"],
        };
        self.invoke("getUpdates", &request).await
    }

    /// Calls a method, pacing it through the rate limiter.
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.rate_limiter.acquire().await;
        let result = self.invoke(method, body).await;
        if let Err(TelegramError::FloodWait(seconds)) = &result {
            self.rate_limiter.flood_wait(*seconds).await;
        }
        result
    }

    async fn invoke<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!("Bot API call: {}", method);
        let response = self
            .http
            .post(format!("{}/{method}", self.base))
            .json(body)
            .send()
            .await?;
        let envelope: ApiResponse<T> = response.json().await?;
        unwrap_envelope(envelope)
    }

    async fn upload_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<Message, TelegramError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "document".to_owned(), |n| n.to_string_lossy().into_owned());

        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", multipart::Part::bytes(bytes).file_name(file_name));
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_owned());
        }

        self.rate_limiter.acquire().await;
        let response = self
            .http
            .post(format!("{}/sendDocument", self.base))
            .multipart(form)
            .send()
            .await?;
        let envelope: ApiResponse<Message> = response.json().await?;
        let result = unwrap_envelope(envelope);
        if let Err(TelegramError::FloodWait(seconds)) = &result {
            self.rate_limiter.flood_wait(*seconds).await;
        }
        result
    }
}

/// Turns a Bot API envelope into a result.
fn unwrap_envelope<T>(envelope: ApiResponse<T>) -> Result<T, TelegramError> {
    if envelope.ok {
        return envelope
            .result
            .ok_or_else(|| TelegramError::Decode("ok answer without result".to_owned()));
    }

    let code = envelope.error_code.unwrap_or_default();
    let description = envelope.description.unwrap_or_default();
    if code == 429 {
        let seconds = envelope
            .parameters
            .and_then(|p| p.retry_after)
            .or_else(|| extract_retry_after(&description))
            .unwrap_or(1);
        return Err(TelegramError::FloodWait(seconds));
    }

    Err(TelegramError::Api { code, description })
}

/// Extracts flood wait seconds from an error description.
fn extract_retry_after(description: &str) -> Option<u32> {
    let lower = description.to_lowercase();
    let idx = lower.find("retry after ")?;
    lower[idx + "retry after ".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef, TelegramError> {
        debug!("Sending to {}: \"{}\"", chat_id, truncate_for_log(text, 40));
        let request = SendMessage {
            chat_id,
            text,
            parse_mode: format.parse_mode(),
            reply_markup: markup.as_ref(),
            disable_web_page_preview: true,
        };
        let message: Message = self.call("sendMessage", &request).await?;
        Ok(MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn edit_text(
        &self,
        target: MessageRef,
        text: &str,
        format: TextFormat,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let request = EditMessageText {
            chat_id: target.chat_id,
            message_id: target.message_id,
            text,
            parse_mode: format.parse_mode(),
            reply_markup: markup.as_ref(),
            disable_web_page_preview: true,
        };
        // Edits of chat messages answer with the message, inline ones with `true`.
        match self.call::<_, serde_json::Value>("editMessageText", &request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_modified() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn edit_markup(
        &self,
        target: MessageRef,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), TelegramError> {
        let request = EditMessageReplyMarkup {
            chat_id: target.chat_id,
            message_id: target.message_id,
            reply_markup: &markup,
        };
        match self
            .call::<_, serde_json::Value>("editMessageReplyMarkup", &request)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_modified() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TelegramError> {
        let request = AnswerCallbackQuery {
            callback_query_id: callback_id,
            text,
            show_alert: alert,
        };
        let _: bool = self.call("answerCallbackQuery", &request).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TelegramError> {
        info!("Sending document {} to {}", path.display(), chat_id);
        match self.upload_document(chat_id, path, caption).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Document upload to {} failed: {}", chat_id, e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_retry_after() {
        assert_eq!(extract_retry_after("Too Many Requests: retry after 35"), Some(35));
        assert_eq!(extract_retry_after("Bad Request: chat not found"), None);
    }

    #[test]
    fn test_unwrap_envelope_ok() {
        let envelope: ApiResponse<bool> =
            serde_json::from_str(r#"{"ok": true, "result": true}"#).unwrap();
        assert!(unwrap_envelope(envelope).unwrap());
    }

    #[test]
    fn test_unwrap_envelope_flood_wait() {
        let envelope: ApiResponse<bool> = serde_json::from_str(
            r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 12"}"#,
        )
        .unwrap();
        assert!(matches!(
            unwrap_envelope(envelope),
            Err(TelegramError::FloodWait(12))
        ));
    }

    #[test]
    fn test_unwrap_envelope_api_error() {
        let envelope: ApiResponse<bool> = serde_json::from_str(
            r#"{"ok": false, "error_code": 400, "description": "Bad Request: message is not modified"}"#,
        )
        .unwrap();
        let err = unwrap_envelope(envelope).unwrap_err();
        assert!(err.is_not_modified());
    }

    #[test]
    fn test_debug_hides_token() {
        let bot = TelegramBot::new(&TelegramConfig::new("123:secret".to_owned()), 40).unwrap();
        assert!(!format!("{bot:?}").contains("secret"));
    }
}
