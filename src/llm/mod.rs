//! Generative text service.
//!
//! [`LlmClient`] is the transport seam; [`generate_post`] and
//! [`generate_proposal`] hold the prompts and the answer parsing.

mod error;
mod openai;
mod post;
mod proposal;

use async_trait::async_trait;

pub use error::LlmError;
pub use openai::OpenAiClient;
pub use post::{GeneratedPost, UNTITLED, extract_json_object, generate_post, parse_post};
pub use proposal::{ProposalPlan, ProposalStage, generate_proposal, proposal_markdown};

/// A chat-style completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one system instruction and one user message, returns the raw answer text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}
