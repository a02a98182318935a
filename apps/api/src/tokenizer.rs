//! Token sizing: the single tokenizer used for document metrics and every
//! pre-call budget check, so both sides of a comparison agree.

use std::fmt;
use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Counts tokens for one model's encoding.
///
/// Known OpenAI models use their tiktoken BPE (gpt-4o → o200k_base). Models
/// tiktoken does not know fall back to a ~4 characters per token estimate,
/// which is still deterministic.
#[derive(Clone)]
pub struct TokenCounter {
    model_id: String,
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenCounter {
    pub fn for_model(model_id: &str) -> Self {
        let bpe = match tiktoken_rs::get_bpe_from_model(model_id) {
            Ok(bpe) => Some(Arc::new(bpe)),
            Err(e) => {
                debug!("No tiktoken encoding for model '{model_id}' ({e}); using estimate");
                None
            }
        };
        Self {
            model_id: model_id.to_string(),
            bpe,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// True when counts come from the model's real encoding.
    pub fn is_exact(&self) -> bool {
        self.bpe.is_some()
    }

    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match &self.bpe {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => estimate_tokens(text),
        }
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter")
            .field("model_id", &self.model_id)
            .field("exact", &self.is_exact())
            .finish()
    }
}

/// One-shot count. Builds the encoding on every call; hold a `TokenCounter`
/// for repeated use.
pub fn count_tokens(text: &str, model_id: &str) -> usize {
    TokenCounter::for_model(model_id).count(text)
}

/// Heuristic: 1 token ≈ 4 characters, rounded up.
fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    (chars + 3) / 4
}
