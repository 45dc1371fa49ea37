use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use super::docx::write_docx;
use super::markdown::parse;
use super::{DocumentConverter, ProposalError};
use crate::llm::{LlmClient, generate_proposal};

/// File name stem for a proposal: `КП_<name>_<YYYYmmdd_HHMM>`.
#[must_use]
pub fn artifact_stem(project_name: &str, at: DateTime<Local>) -> String {
    let mut name: String = project_name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .take(60)
        .collect();
    if name.is_empty() {
        name.push_str("project");
    }
    format!("КП_{name}_{}", at.format("%Y%m%d_%H%M"))
}

/// A generated proposal on disk.
///
/// `path` is the file to distribute; every file the pipeline created,
/// `path` included, is removed by [`ProposalArtifact::cleanup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalArtifact {
    pub path: PathBuf,
    pub temporaries: Vec<PathBuf>,
}

impl ProposalArtifact {
    /// Deletes the artifact and its intermediates.
    pub async fn cleanup(self) {
        for file in self.temporaries.iter().chain(std::iter::once(&self.path)) {
            if let Err(e) = tokio::fs::remove_file(file).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to remove {}: {}", file.display(), e);
            }
        }
    }
}

/// Generates proposal content and renders it to a document.
pub struct ProposalBuilder {
    llm: Arc<dyn LlmClient>,
    output_dir: PathBuf,
    converter: Option<Arc<dyn DocumentConverter>>,
}

impl ProposalBuilder {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            llm,
            output_dir: output_dir.into(),
            converter: None,
        }
    }

    /// Also converts the document (e.g. to PDF) before handing it out.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Runs the whole pipeline for one project.
    pub async fn build(&self, brief: &str, project_name: &str) -> Result<ProposalArtifact, ProposalError> {
        let markdown = generate_proposal(self.llm.as_ref(), brief, project_name).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let stem = artifact_stem(project_name, Local::now());
        let md_path = self.output_dir.join(format!("{stem}.md"));
        let docx_path = self.output_dir.join(format!("{stem}.docx"));

        tokio::fs::write(&md_path, &markdown).await?;
        let blocks = parse(&markdown);
        let (name, target) = (project_name.to_owned(), docx_path.clone());
        let written = tokio::task::spawn_blocking(move || write_docx(&blocks, &name, &target))
            .await
            .unwrap_or_else(|e| Err(e.into()));
        if let Err(e) = written {
            discard(&[md_path.as_path(), docx_path.as_path()]).await;
            return Err(e.into());
        }
        info!("Proposal document ready: {}", docx_path.display());

        let mut artifact = ProposalArtifact {
            path: docx_path,
            temporaries: vec![md_path],
        };

        if let Some(converter) = &self.converter {
            let converted = converter.convert(&artifact.path).await;
            if converted != artifact.path {
                let docx = std::mem::replace(&mut artifact.path, converted);
                artifact.temporaries.push(docx);
            }
        }

        Ok(artifact)
    }
}

async fn discard(files: &[&Path]) {
    for file in files {
        let _ = tokio::fs::remove_file(file).await;
    }
}
