use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::generation::DraftError;
use crate::ingest::IngestError;
use crate::llm_client::LlmError;
use crate::prompts::PromptError;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every failure is scoped to the one request that produced it.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Structured output did not match the expected shape: {message}")]
    SchemaValidation { message: String, raw: String },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DraftError> for AppError {
    fn from(e: DraftError) -> Self {
        match e {
            DraftError::Prompt(e) => AppError::Prompt(e),
            DraftError::Llm(e) => AppError::Llm(e),
            DraftError::SchemaValidation { message, raw } => {
                AppError::SchemaValidation { message, raw }
            }
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<Value>) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::Ingest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INGEST_ERROR", None),
            AppError::Prompt(PromptError::UnknownPrompt(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN_PROMPT", None)
            }
            AppError::Prompt(PromptError::MissingContext { needs, .. }) => (
                StatusCode::CONFLICT,
                "MISSING_CONTEXT",
                Some(json!({ "needs": needs })),
            ),
            AppError::Prompt(PromptError::Format { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROMPT_FORMAT_ERROR", None)
            }
            AppError::Llm(LlmError::TokenBudgetExceeded {
                prompt_tokens,
                max_output_tokens,
                max_allowable_tokens,
                deficit,
            }) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "TOKEN_BUDGET_EXCEEDED",
                Some(json!({
                    "prompt_tokens": prompt_tokens,
                    "max_output_tokens": max_output_tokens,
                    "max_allowable_tokens": max_allowable_tokens,
                    "deficit": deficit
                })),
            ),
            AppError::Llm(LlmError::UnsupportedBackend(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UNSUPPORTED_BACKEND", None)
            }
            AppError::Llm(LlmError::Generation(_)) => {
                (StatusCode::BAD_GATEWAY, "GENERATION_ERROR", None)
            }
            AppError::Llm(LlmError::Timeout(_)) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", None),
            AppError::SchemaValidation { raw, .. } => (
                StatusCode::BAD_GATEWAY,
                "SCHEMA_VALIDATION_ERROR",
                Some(json!({ "raw": raw })),
            ),
            AppError::Session(SessionError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", None)
            }
            AppError::Session(SessionError::NoDocument) => {
                (StatusCode::CONFLICT, "MISSING_CONTEXT", Some(json!({ "needs": "a document" })))
            }
            AppError::Session(SessionError::DocumentChanged(_)) => {
                (StatusCode::CONFLICT, "DOCUMENT_CHANGED", None)
            }
            AppError::Session(SessionError::EditedDuringDraft(_)) => {
                (StatusCode::CONFLICT, "FRAGMENT_CHANGED", None)
            }
            AppError::Session(SessionError::NoFigureIndex) => (
                StatusCode::CONFLICT,
                "MISSING_CONTEXT",
                Some(json!({ "needs": "a figure list" })),
            ),
            AppError::Session(
                SessionError::WrongKind { .. }
                | SessionError::EmptyEdit(_)
                | SessionError::UnknownFigure(_),
            ) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();

        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                e.to_string()
            }
            AppError::Prompt(e @ (PromptError::UnknownPrompt(_) | PromptError::Format { .. })) => {
                tracing::error!("Prompt wiring error: {e}");
                e.to_string()
            }
            other => other.to_string(),
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
