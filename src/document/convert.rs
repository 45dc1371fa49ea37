//! Optional DOCX → PDF conversion through an office suite.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

/// Turns a document into another format.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Returns the converted copy, or `source` unchanged when conversion fails.
    async fn convert(&self, source: &Path) -> PathBuf;
}

/// Runs `soffice --headless --convert-to pdf`.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    binary: String,
}

impl OfficeConverter {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl DocumentConverter for OfficeConverter {
    async fn convert(&self, source: &Path) -> PathBuf {
        let out_dir = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let target = source.with_extension("pdf");

        let result = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(source)
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() && target.exists() => {
                info!("Converted {} to PDF", source.display());
                target
            }
            Ok(output) => {
                warn!(
                    "PDF conversion of {} failed ({}): {}",
                    source.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                source.to_path_buf()
            }
            Err(e) => {
                warn!("Could not run {}: {}", self.binary, e);
                source.to_path_buf()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_keeps_original() {
        let converter = OfficeConverter::new("definitely-not-an-office-suite");
        let source = Path::new("/tmp/kp.docx");
        assert_eq!(converter.convert(source).await, source);
    }

    #[tokio::test]
    async fn test_failing_binary_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("kp.docx");
        std::fs::write(&source, b"x").unwrap();

        let converter = OfficeConverter::new("false");
        assert_eq!(converter.convert(&source).await, source);
    }
}
