//! Document text extraction.
//!
//! The production extractor shells out to `pdftotext` (poppler-utils); each
//! invocation is guarded by a per-command timeout.

use std::io::Write;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::errors::ApiError;

/// One logical unit of extracted text (a page, for PDFs).
#[derive(Debug, Clone)]
pub struct PageText {
    pub page: usize,
    pub text: String,
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract per-unit text from the raw document bytes. An empty result is
    /// a valid outcome (e.g. scanned-image PDFs with no text layer) and is
    /// mapped to `ExtractionFailed` by the pipeline.
    async fn extract(&self, data: &[u8], filename: &str) -> Result<Vec<PageText>, ApiError>;
}

pub struct PdfTextExtractor {
    timeout_secs: u64,
}

impl PdfTextExtractor {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl DocumentExtractor for PdfTextExtractor {
    async fn extract(&self, data: &[u8], filename: &str) -> Result<Vec<PageText>, ApiError> {
        if data.is_empty() {
            return Err(ApiError::ExtractionFailed(
                "Cannot extract text from an empty file".to_string(),
            ));
        }

        // Validate PDF magic bytes (%PDF)
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(ApiError::UnsupportedFormat(format!(
                "File '{}' is not a valid PDF (missing %PDF header)",
                filename
            )));
        }

        // pdftotext reads from a file path
        let mut tmpfile = NamedTempFile::new().map_err(ApiError::internal)?;
        tmpfile.write_all(data).map_err(ApiError::internal)?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        let output = run_cmd_with_timeout(
            Command::new("pdftotext")
                .arg("-layout")
                .arg(&tmp_path)
                .arg("-"),
            self.timeout_secs,
        )
        .await?;

        // pdftotext separates pages with form feeds
        let pages: Vec<PageText> = output
            .split('\u{c}')
            .enumerate()
            .filter_map(|(idx, raw)| {
                let text = raw.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(PageText {
                        page: idx + 1,
                        text: text.to_string(),
                    })
                }
            })
            .collect();

        tracing::debug!("Extracted {} text page(s) from '{}'", pages.len(), filename);
        Ok(pages)
    }
}

async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String, ApiError> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            ApiError::ExtractionFailed(format!(
                "Extraction command timed out after {}s",
                timeout_secs
            ))
        })?
        .map_err(|e| ApiError::ExtractionFailed(format!("Failed to run pdftotext: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ApiError::ExtractionFailed(format!(
            "pdftotext failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_pdf_bytes() {
        let extractor = PdfTextExtractor::new(5);
        let err = extractor
            .extract(b"plain text, not a pdf", "notes.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let extractor = PdfTextExtractor::new(5);
        let err = extractor.extract(b"", "empty.pdf").await.unwrap_err();
        assert!(matches!(err, ApiError::ExtractionFailed(_)));
    }
}
