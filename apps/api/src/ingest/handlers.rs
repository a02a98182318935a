//! Axum route handler for document upload.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::{ingest, DocumentMetrics, FileKind, IngestError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub file_name: Option<String>,
    pub kind: FileKind,
    pub metrics: DocumentMetrics,
    pub max_allowable_tokens: usize,
    /// Tokens the document alone is over the ceiling, if any. Drafting will
    /// fail the budget check until a shorter document is uploaded.
    pub token_deficit: Option<usize>,
}

struct Upload {
    bytes: Bytes,
    file_name: Option<String>,
    kind: FileKind,
}

/// POST /api/v1/sessions/:id/document
///
/// Multipart upload with a `file` part (PDF or plain text). Replaces the
/// session's document and clears every fragment drafted from the old one.
pub async fn handle_upload_document(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    // Fail fast on an unknown session before reading the body.
    state.sessions.read(session_id, |_| ()).await?;

    let upload = read_upload(multipart).await?;
    info!(
        "Session {}: received {:?} upload {:?} ({} bytes)",
        session_id,
        upload.kind,
        upload.file_name,
        upload.bytes.len()
    );

    let marker = state.config.reference_marker.clone();
    let tokens = state.llm.tokens().clone();
    let kind = upload.kind;
    let bytes = upload.bytes;
    let document = tokio::task::spawn_blocking(move || ingest(&bytes, kind, &marker, &tokens))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Document extraction task panicked: {e}")))??;

    let metrics = document.metrics();
    let max_allowable_tokens = state.llm.max_allowable_tokens();
    let token_deficit = document.budget_deficit(max_allowable_tokens);
    if let Some(deficit) = token_deficit {
        warn!(
            "Session {}: document is {} tokens over the {} token limit",
            session_id, deficit, max_allowable_tokens
        );
    }

    let file_name = upload.file_name.clone();
    state
        .sessions
        .update(session_id, |session| session.set_document(document, file_name))
        .await?;

    Ok(Json(UploadResponse {
        session_id,
        file_name: upload.file_name,
        kind,
        metrics,
        max_allowable_tokens,
        token_deficit,
    }))
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let kind = field
            .content_type()
            .and_then(FileKind::from_content_type)
            .or_else(|| file_name.as_deref().and_then(FileKind::from_file_name))
            .ok_or_else(|| {
                IngestError::UnsupportedKind(
                    field
                        .content_type()
                        .unwrap_or("unknown content type")
                        .to_string(),
                )
            })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| IngestError::Upload(e.to_string()))?;
        return Ok(Upload {
            bytes,
            file_name,
            kind,
        });
    }
    Err(AppError::Validation(
        "multipart body must include a 'file' part".to_string(),
    ))
}
