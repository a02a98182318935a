// Highlight drafting: fragment catalogue, structured and free-text generation,
// and post-processing heuristics.
// All backend calls go through llm_client; nothing here talks HTTP directly.

pub mod drafter;
pub mod fragments;
pub mod handlers;
pub mod heuristics;
pub mod structured;
pub mod text;

use thiserror::Error;

use crate::llm_client::LlmError;
use crate::prompts::PromptError;

/// Failure of a single fragment request. Never affects other fragments.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Structured output did not match the expected shape: {message}")]
    SchemaValidation { message: String, raw: String },
}
