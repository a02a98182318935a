//! Axum route handlers for sessions and fragment drafting.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::drafter::{draft_fragment, DraftOutput};
use crate::generation::fragments::FragmentId;
use crate::generation::text::Reduction;
use crate::session::{FragmentValue, SessionSnapshot, TemplateSlots};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// Overrides the fragment's default temperature; clamped to 0..=1.
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct FragmentResponse {
    pub session_id: Uuid,
    pub fragment: FragmentId,
    pub value: FragmentValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction: Option<Reduction>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EditRequest {
    Points { points: Vec<String> },
    Text { text: String },
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub fragment: FragmentId,
    pub cleared: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelectFigureRequest {
    pub figure_id: String,
}

#[derive(Debug, Serialize)]
pub struct SelectFigureResponse {
    pub selected_figure: String,
}

fn parse_fragment(name: &str) -> Result<FragmentId, AppError> {
    name.parse::<FragmentId>()
        .map_err(|e| AppError::NotFound(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state.sessions.read(session_id, |s| s.snapshot()).await?;
    Ok(Json(snapshot))
}

/// DELETE /api/v1/sessions/:id
///
/// Drops the session, its document and every fragment.
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/fragments/:fragment/generate
///
/// Drafts one fragment from the session's document. The session lock is only
/// held to copy inputs out and to store the result, never during the backend call.
pub async fn handle_generate_fragment(
    State(state): State<AppState>,
    Path((session_id, fragment)): Path<(Uuid, String)>,
    request: Option<Json<GenerateRequest>>,
) -> Result<Json<FragmentResponse>, AppError> {
    let fragment = parse_fragment(&fragment)?;
    let spec = fragment.draft_spec().ok_or_else(|| {
        AppError::Validation(format!("'{fragment}' is entered manually and cannot be generated"))
    })?;
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let inputs = state
        .sessions
        .read(session_id, |s| s.draft_inputs(&spec))
        .await??;

    let output = draft_fragment(
        &state.llm,
        &spec,
        inputs.document.text(),
        inputs.context.as_deref(),
        request.temperature,
    )
    .await
    .map_err(|e| {
        warn!("Session {}: drafting '{}' failed: {}", session_id, fragment, e);
        AppError::from(e)
    })?;

    let reduction = match &output {
        DraftOutput::Text(text) => Some(text.reduction),
        DraftOutput::Points { .. } | DraftOutput::Figures { .. } => None,
    };
    let value = state
        .sessions
        .update(session_id, |s| s.store_draft(fragment, &inputs, output))
        .await??;

    Ok(Json(FragmentResponse {
        session_id,
        fragment,
        value,
        reduction,
    }))
}

/// PUT /api/v1/sessions/:id/fragments/:fragment
///
/// Manual edit. `{"text": ...}` for text fragments, `{"points": [...]}` for lists.
pub async fn handle_edit_fragment(
    State(state): State<AppState>,
    Path((session_id, fragment)): Path<(Uuid, String)>,
    Json(request): Json<EditRequest>,
) -> Result<Json<FragmentResponse>, AppError> {
    let fragment = parse_fragment(&fragment)?;
    let value = state
        .sessions
        .update(session_id, |s| match &request {
            EditRequest::Text { text } => s.edit_text(fragment, text),
            EditRequest::Points { points } => s.edit_points(fragment, points),
        })
        .await??;

    Ok(Json(FragmentResponse {
        session_id,
        fragment,
        value,
        reduction: None,
    }))
}

/// DELETE /api/v1/sessions/:id/fragments/:fragment
pub async fn handle_clear_fragment(
    State(state): State<AppState>,
    Path((session_id, fragment)): Path<(Uuid, String)>,
) -> Result<Json<ClearResponse>, AppError> {
    let fragment = parse_fragment(&fragment)?;
    let cleared = state
        .sessions
        .update(session_id, |s| s.clear(fragment))
        .await?;
    Ok(Json(ClearResponse { fragment, cleared }))
}

/// PUT /api/v1/sessions/:id/figure-selection
pub async fn handle_select_figure(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectFigureRequest>,
) -> Result<Json<SelectFigureResponse>, AppError> {
    let figure_id = request.figure_id.trim().to_string();
    state
        .sessions
        .update(session_id, |s| s.select_figure(&figure_id))
        .await??;
    Ok(Json(SelectFigureResponse {
        selected_figure: figure_id,
    }))
}

/// GET /api/v1/sessions/:id/slots
///
/// Flat slot mapping for the templating collaborator, plus the export base
/// name and whether the slide has everything it needs.
pub async fn handle_get_slots(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<TemplateSlots>, AppError> {
    let today = Utc::now().date_naive();
    let slots = state.sessions.read(session_id, |s| s.slots(today)).await?;
    Ok(Json(slots))
}
