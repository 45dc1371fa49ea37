//! Commercial-proposal content generation.
//!
//! The model may answer with a JSON plan of stages or with a ready markdown
//! document. Both end up as markdown, which the document renderer consumes.

use std::fmt::Write as _;

use serde::Deserialize;
use tracing::{debug, info};

use super::{LlmClient, LlmError};

const PROPOSAL_SYSTEM_PROMPT: &str = r#"Ты опытный менеджер IT-студии. По брифу клиента составь коммерческое предложение.

Верни ЛИБО один JSON-объект такой формы (без комментариев):
{
  "title": "название проекта",
  "summary": "1-2 абзаца о задаче и подходе",
  "stages": [
    {"name": "Этап", "tasks": ["задача", "задача"], "price": "50 000 ₽", "duration": "2 недели"}
  ],
  "total_price": "итоговая стоимость",
  "total_duration": "итоговый срок",
  "notes": ["условие", "условие"]
}
ЛИБО документ в Markdown: заголовки, таблица этапов (Этап | Стоимость | Срок), списки задач.

Правила:
- Цены в рублях, сроки в неделях.
- Не выдумывай требования, которых нет в брифе; допущения помечай явно.
- Без контактов заказчика."#;

/// One itemized stage of a proposal.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProposalStage {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub duration: String,
}

/// Structured proposal as the model returns it in JSON mode.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProposalPlan {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub stages: Vec<ProposalStage>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default)]
    pub total_duration: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ProposalPlan {
    /// Renders the plan as markdown: summary, stage table, task lists, totals.
    #[must_use]
    pub fn to_markdown(&self, project_name: &str) -> String {
        let mut md = String::new();
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(project_name);
        let _ = writeln!(md, "# {}\n", cell(title));

        if let Some(summary) = self.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            let _ = writeln!(md, "## О проекте\n\n{}\n", summary.trim());
        }

        if !self.stages.is_empty() {
            md.push_str("## Этапы и стоимость\n\n");
            md.push_str("| Этап | Стоимость | Срок |\n|---|---|---|\n");
            for stage in &self.stages {
                let _ = writeln!(
                    md,
                    "| {} | {} | {} |",
                    cell(&stage.name),
                    cell(&stage.price),
                    cell(&stage.duration)
                );
            }
            md.push('\n');

            md.push_str("## Состав работ\n\n");
            for stage in &self.stages {
                let _ = writeln!(md, "### {}\n", stage.name.trim());
                for task in &stage.tasks {
                    let _ = writeln!(md, "- {}", task.trim());
                }
                md.push('\n');
            }
        }

        if self.total_price.is_some() || self.total_duration.is_some() {
            md.push_str("---\n\n");
            if let Some(price) = &self.total_price {
                let _ = writeln!(md, "**Итого:** {}\n", price.trim());
            }
            if let Some(duration) = &self.total_duration {
                let _ = writeln!(md, "**Срок:** {}\n", duration.trim());
            }
        }

        if !self.notes.is_empty() {
            md.push_str("## Условия\n\n");
            for note in &self.notes {
                let _ = writeln!(md, "- {}", note.trim());
            }
        }

        md.trim_end().to_owned()
    }
}

/// Keeps table cells on one line and free of column separators.
fn cell(text: &str) -> String {
    text.trim().replace('|', "/").replace('\n', " ")
}

/// Asks the model for a proposal and returns it as markdown.
pub async fn generate_proposal(
    client: &dyn LlmClient,
    brief: &str,
    project_name: &str,
) -> Result<String, LlmError> {
    let user = format!(
        "Название проекта: {project_name}\n\nБриф клиента:\n\n{}",
        brief.trim()
    );
    debug!(brief_len = brief.len(), "generate_proposal: request built");

    let raw = client.complete(PROPOSAL_SYSTEM_PROMPT, &user).await?;
    let markdown = proposal_markdown(&raw, project_name)?;

    info!(
        "Proposal content ok: project='{}' md_len={}",
        project_name,
        markdown.len()
    );
    Ok(markdown)
}

/// Interprets a model answer as a JSON plan when it is an object, markdown otherwise.
///
/// An answer that opens with `{` must be a complete plan.
pub fn proposal_markdown(raw: &str, project_name: &str) -> Result<String, LlmError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    let unfenced = strip_outer_fence(trimmed);
    if unfenced.starts_with('{') {
        let plan: ProposalPlan = serde_json::from_str(unfenced)?;
        return Ok(plan.to_markdown(project_name));
    }

    Ok(unfenced.to_owned())
}

/// Removes a code fence wrapping the whole answer, if there is one.
fn strip_outer_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (e.g. `markdown`, `json`).
    body.split_once('\n').map_or(body, |(_, inner)| inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn plan_json() -> &'static str {
        r#"{
            "title": "Бот для ресторана",
            "summary": "Telegram-бот для бронирования столиков.",
            "stages": [
                {"name": "Дизайн", "tasks": ["Прототип"], "price": "30 000 ₽", "duration": "1 неделя"},
                {"name": "Разработка", "tasks": ["Бот", "Админка"], "price": "120 000 ₽", "duration": "4 недели"}
            ],
            "total_price": "150 000 ₽",
            "notes": ["Оплата 50/50"]
        }"#
    }

    #[test]
    fn test_plan_to_markdown_has_stage_table() {
        let md = proposal_markdown(plan_json(), "fallback").unwrap();
        assert!(md.starts_with("# Бот для ресторана"));
        assert!(md.contains("| Этап | Стоимость | Срок |"));
        assert!(md.contains("| Разработка | 120 000 ₽ | 4 недели |"));
        assert!(md.contains("- Админка"));
        assert!(md.contains("**Итого:** 150 000 ₽"));
        assert!(md.contains("- Оплата 50/50"));
    }

    #[test]
    fn test_plan_without_title_uses_project_name() {
        let raw = r#"{"stages": [{"name": "MVP"}]}"#;
        let md = proposal_markdown(raw, "Кофейня").unwrap();
        assert!(md.starts_with("# Кофейня"));
    }

    #[test]
    fn test_markdown_answer_used_as_is() {
        let raw = "```markdown\n# КП\n\nТекст\n```";
        assert_eq!(proposal_markdown(raw, "x").unwrap(), "# КП\n\nТекст");
    }

    #[test]
    fn test_broken_plan_is_error() {
        assert!(matches!(
            proposal_markdown("{\"title\": \"КП\", \"stages\": [", "Проект"),
            Err(LlmError::InvalidJson(_))
        ));
        let fenced = "```json\n{\"title\": \"КП\", \"stages\": [\n```";
        assert!(proposal_markdown(fenced, "Проект").is_err());
    }

    #[test]
    fn test_pipes_in_cells_are_replaced() {
        assert_eq!(cell(" a | b\nc "), "a / b c");
    }

    #[test]
    fn test_empty_answer_is_error() {
        assert!(matches!(
            proposal_markdown("   ", "x"),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_generate_proposal_includes_project_name() {
        let llm = ScriptedLlm::new(vec![Ok("# КП\n\nТекст".to_owned())]);
        let md = generate_proposal(&llm, "бриф", "Кофейня").await.unwrap();
        assert_eq!(md, "# КП\n\nТекст");
        assert!(llm.prompts()[0].starts_with("Название проекта: Кофейня"));
    }
}
