use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::state::AppState;

/// `POST /upload` — accept a PDF (multipart field `file`), store its
/// embeddings in the index and keep the raw upload on disk.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Malformed multipart body: {}", err)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .ok_or_else(|| ApiError::BadRequest("Missing filename in upload".to_string()))?;
        let content_type = field.content_type().map(|ct| ct.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(format!("Failed to read upload: {}", err)))?;
        upload = Some((filename, content_type, data.to_vec()));
        break;
    }

    let (filename, content_type, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' field in upload".to_string()))?;

    let file_id = Uuid::new_v4().to_string();

    let report = state
        .pipeline
        .ingest(&data, &filename, content_type.as_deref())
        .await?;

    // Keep the raw upload next to the index for reference. Stored only after
    // a successful ingest so the upload directory mirrors indexed content.
    let stored_name = format!("{}_{}", file_id, sanitize_filename(&filename));
    let path = state.config.ingest.upload_dir.join(stored_name);
    if let Err(err) = tokio::fs::write(&path, &data).await {
        tracing::warn!("Failed to persist upload '{}': {}", path.display(), err);
    }

    Ok(Json(json!({
        "message": "PDF uploaded and processed successfully!",
        "file_id": file_id,
        "chunks_stored": report.chunks_stored,
    })))
}

fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized_for_storage() {
        assert_eq!(sanitize_filename("report v2.pdf"), "report_v2.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("plain.pdf"), "plain.pdf");
    }
}
