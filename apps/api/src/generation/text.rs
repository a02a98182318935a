//! Unstructured Generator: free-text fragments with an optional word window.
//!
//! If the first completion runs over the window's maximum, exactly one
//! corrective "reduce" completion is issued and its output replaces the
//! original whether or not it now fits. A failed corrective call keeps the
//! original text. At most two backend calls per fragment request.

use serde::Serialize;
use tracing::{info, warn};

use crate::generation::DraftError;
use crate::llm_client::prompts::SYSTEM_SCOPE;
use crate::llm_client::LlmClient;
use crate::prompts::{format_prompt, format_word_reduction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WordWindow {
    pub min: usize,
    pub max: usize,
}

impl WordWindow {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn exceeded_by(&self, text: &str) -> bool {
        word_count(text) > self.max
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// What the post-processor did to the first completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    NotNeeded,
    Applied,
    /// The corrective call failed; the over-length original was kept.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedText {
    pub text: String,
    pub reduction: Reduction,
    pub initial_word_count: usize,
}

pub async fn generate_text(
    llm: &LlmClient,
    prompt_name: &str,
    main_text: &str,
    secondary_text: Option<&str>,
    max_output_tokens: u32,
    temperature: f32,
    word_window: Option<WordWindow>,
) -> Result<GeneratedText, DraftError> {
    let prompt = format_prompt(prompt_name, main_text, secondary_text)?;
    let request = llm.request(SYSTEM_SCOPE, &prompt, max_output_tokens, temperature);
    let response = llm.complete(&request).await?.trim().to_string();
    let initial_word_count = word_count(&response);

    let Some(window) = word_window.filter(|w| w.exceeded_by(&response)) else {
        info!("Text fragment '{}' generated: {} words", prompt_name, initial_word_count);
        return Ok(GeneratedText {
            text: response,
            reduction: Reduction::NotNeeded,
            initial_word_count,
        });
    };

    info!(
        "Text fragment '{}' has {} words (max {}); requesting one reduction pass",
        prompt_name, initial_word_count, window.max
    );
    match reduce(llm, &response, window, max_output_tokens, temperature).await {
        Ok(reduced) => {
            info!(
                "Text fragment '{}' reduced: {} -> {} words",
                prompt_name,
                initial_word_count,
                word_count(&reduced)
            );
            Ok(GeneratedText {
                text: reduced,
                reduction: Reduction::Applied,
                initial_word_count,
            })
        }
        Err(e) => {
            warn!(
                "Word-count reduction for '{}' failed; keeping original: {}",
                prompt_name, e
            );
            Ok(GeneratedText {
                text: response,
                reduction: Reduction::Failed,
                initial_word_count,
            })
        }
    }
}

async fn reduce(
    llm: &LlmClient,
    text: &str,
    window: WordWindow,
    max_output_tokens: u32,
    temperature: f32,
) -> Result<String, DraftError> {
    let prompt = format_word_reduction(text, window.min, window.max)?;
    let request = llm.request(SYSTEM_SCOPE, &prompt, max_output_tokens, temperature);
    Ok(llm.complete(&request).await?.trim().to_string())
}
