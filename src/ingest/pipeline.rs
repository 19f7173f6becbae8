use std::sync::Arc;

use crate::embedding::Embedder;
use crate::errors::ApiError;
use crate::index::{StoredChunk, VectorIndex};

use super::extractor::DocumentExtractor;
use super::splitter::RecursiveSplitter;

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub chunks_stored: usize,
    pub pages: usize,
}

/// Loads a document, splits it into overlapping chunks and stores each chunk
/// with its embedding in the index.
pub struct IngestPipeline {
    extractor: Arc<dyn DocumentExtractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    splitter: RecursiveSplitter,
}

impl IngestPipeline {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        splitter: RecursiveSplitter,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            splitter,
        }
    }

    /// Ingest a document. Storage is best-effort per chunk batch: a failure
    /// mid-batch is reported but already-stored chunks are not rolled back
    /// (the index is additive-only and tolerates duplicates on retry).
    pub async fn ingest(
        &self,
        data: &[u8],
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<IngestReport, ApiError> {
        check_document_format(filename, content_type)?;

        let pages = self.extractor.extract(data, filename).await?;
        if pages.is_empty() {
            return Err(ApiError::ExtractionFailed(format!(
                "Unable to extract any text from '{}'",
                filename
            )));
        }

        // Chunks are numbered across the whole document, not per page.
        let mut chunks: Vec<StoredChunk> = Vec::new();
        for page in &pages {
            for text in self.splitter.split(&page.text) {
                chunks.push(StoredChunk {
                    text,
                    source: format!("{}#page={}", filename, page.page),
                    chunk_index: chunks.len(),
                });
            }
        }

        let mut stored = 0usize;
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.text).await.map_err(|err| {
                partial_failure(filename, stored, err)
            })?;
            self.index
                .add(vector, chunk)
                .map_err(|err| partial_failure(filename, stored, err))?;
            stored += 1;
        }

        tracing::info!(
            "Ingested '{}': {} page(s), {} chunk(s) stored",
            filename,
            pages.len(),
            stored
        );

        Ok(IngestReport {
            chunks_stored: stored,
            pages: pages.len(),
        })
    }
}

fn check_document_format(filename: &str, content_type: Option<&str>) -> Result<(), ApiError> {
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::UnsupportedFormat(
            "Only PDF files are allowed.".to_string(),
        ));
    }
    if let Some(declared) = content_type {
        if declared != "application/pdf" {
            return Err(ApiError::UnsupportedFormat(format!(
                "Unexpected content type '{}'; only application/pdf is accepted.",
                declared
            )));
        }
    }
    Ok(())
}

fn partial_failure(filename: &str, stored: usize, err: ApiError) -> ApiError {
    ApiError::Index(format!(
        "Failed to store chunks for '{}' ({} already stored): {}",
        filename, stored, err
    ))
}
