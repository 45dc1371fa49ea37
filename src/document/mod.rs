//! Commercial-proposal documents.
//!
//! [`markdown`] turns text into structural blocks, [`docx`] writes them
//! out, [`convert`] optionally produces a PDF copy and [`proposal`] chains
//! the generative service and all of the above.

pub mod convert;
pub mod docx;
pub mod markdown;
mod proposal;

use thiserror::Error;

use crate::llm::LlmError;

pub use convert::{DocumentConverter, OfficeConverter};
pub use markdown::{Block, ListItem, Span, parse};
pub use proposal::{ProposalArtifact, ProposalBuilder, artifact_stem};

/// Errors from writing a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to pack document: {0}")]
    Pack(String),

    #[error("Render worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Errors from the whole proposal pipeline.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("Proposal generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Proposal rendering failed: {0}")]
    Render(#[from] RenderError),
}

impl From<std::io::Error> for ProposalError {
    fn from(e: std::io::Error) -> Self {
        Self::Render(RenderError::Io(e))
    }
}
