//! Channel-post generation from a collected brief.

use serde::Deserialize;
use tracing::{debug, info};

use super::{LlmClient, LlmError};
use crate::config::MAX_TITLE_LENGTH;

/// Title used when the model leaves it blank.
pub const UNTITLED: &str = "Без названия";

const POST_SYSTEM_PROMPT: &str = r#"Ты помощник, который превращает сырой бриф клиента (несколько сообщений, краткие описания вложений)
в аккуратный пост для TG-канала по заданному шаблону.

Строго верни один JSON-объект БЕЗ Markdown и комментариев такой формы:
{
  "title": "краткое название проекта",
  "tg_post": "текст поста в Markdown по шаблону"
}

Шаблон поста:
❗️ {Название проекта/задачи}
✅ СТАТУС: открыт ✅

✍️ Что за проект:
{одно-два абзаца — самое основное, без воды}

📎 Полное тз по ссылке
{ссылка на гугл документ, если нет — напиши 'добавим после согласования'}

💸 Оплата и сроки: ставит исполнитель

👨‍💻 Кто нужен в проект:
{роль и стек/требования}

📩 Отклики:
Пишите сюда👉 @Edward0076
В отклике указывайте:
Стек и портфолио

Правила:
- Никаких контактов заказчика.
- Если данных не хватает — используй разумные заглушки, ничего не выдумывай.
- Ограничение длины tg_post: 900–1100 символов.
- Отвечай строго одним JSON-объектом по описанной схеме."#;

/// A generated post waiting for operator review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPost {
    /// Short project title, at most [`MAX_TITLE_LENGTH`] characters.
    pub title: String,
    /// Post body with surrounding whitespace removed.
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    title: String,
    tg_post: String,
}

/// Asks the model for a post and validates the structured answer.
pub async fn generate_post(client: &dyn LlmClient, brief: &str) -> Result<GeneratedPost, LlmError> {
    let user = format!(
        "Сырые материалы клиента (допускается шум):\n\n{}",
        brief.trim()
    );
    debug!(brief_len = brief.len(), "generate_post: request built");

    let raw = client.complete(POST_SYSTEM_PROMPT, &user).await?;
    let post = parse_post(&raw)?;

    info!(
        "Generation ok: title='{}' post_len={}",
        post.title,
        post.body.chars().count()
    );
    Ok(post)
}

/// Parses the model's answer into a post.
pub fn parse_post(raw: &str) -> Result<GeneratedPost, LlmError> {
    let json = extract_json_object(raw)?;
    let parsed: RawPost = serde_json::from_str(json)?;

    let body = parsed.tg_post.trim().to_owned();
    if body.is_empty() {
        return Err(LlmError::InvalidResponse("tg_post is empty".to_owned()));
    }

    let title = match parsed.title.trim() {
        "" => UNTITLED.to_owned(),
        t => t.chars().take(MAX_TITLE_LENGTH).collect(),
    };

    Ok(GeneratedPost { title, body })
}

/// Returns the span from the first `{` to the last `}` of the answer.
///
/// Models like to wrap JSON in prose or code fences; this strips both.
pub fn extract_json_object(raw: &str) -> Result<&str, LlmError> {
    if raw.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    let start = raw.find('{').ok_or(LlmError::MissingJson)?;
    let end = raw.rfind('}').ok_or(LlmError::MissingJson)?;
    if end < start {
        return Err(LlmError::MissingJson);
    }
    Ok(&raw[start..=end])
}
