//! LLM Client: the single point of entry for all completion calls.
//!
//! ARCHITECTURAL RULE: No drafting module may call a backend directly.
//! Every completion goes through `LlmClient::complete`, which enforces the
//! token budget before anything is sent and bounds the call with a timeout.
//!
//! Two interchangeable backends implement `CompletionBackend`: the direct
//! OpenAI completion API and the Azure-hosted chat deployment. Which one is
//! used is a configuration value, never discovered at runtime.
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::tokenizer::TokenCounter;

pub mod azure;
mod chat;
pub mod openai;
pub mod prompts;

#[cfg(test)]
pub mod testing;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_ALLOWABLE_TOKENS: usize = 150_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(
        "Prompt ({prompt_tokens} tokens) plus max output ({max_output_tokens} tokens) \
         exceeds the {max_allowable_tokens} token limit by {deficit}"
    )]
    TokenBudgetExceeded {
        prompt_tokens: usize,
        max_output_tokens: usize,
        max_allowable_tokens: usize,
        deficit: usize,
    },

    #[error("Unsupported LLM backend: '{0}'")]
    UnsupportedBackend(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Backend call timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Direct completion API.
    OpenAi,
    /// Chat wrapper around an enterprise-hosted deployment.
    Azure,
}

impl FromStr for BackendKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAi),
            "azure" | "azure_openai" => Ok(BackendKind::Azure),
            other => Err(LlmError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// One completion call. Built per call, never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_text: String,
    pub user_text: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub model_id: String,
}

/// Capability every backend protocol provides.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub model_id: String,
    pub max_allowable_tokens: usize,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL.to_string(),
            max_allowable_tokens: DEFAULT_MAX_ALLOWABLE_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// The single LLM client shared by every drafting request.
/// Read-only after construction; clones share the backend.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn CompletionBackend>,
    tokens: TokenCounter,
    settings: ClientSettings,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, settings: ClientSettings) -> Self {
        Self {
            tokens: TokenCounter::for_model(&settings.model_id),
            backend,
            settings,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let backend = build_backend(config)?;
        Ok(Self::new(
            backend,
            ClientSettings {
                model_id: config.model_id.clone(),
                max_allowable_tokens: config.max_allowable_tokens,
                timeout: config.llm_timeout,
            },
        ))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    pub fn max_allowable_tokens(&self) -> usize {
        self.settings.max_allowable_tokens
    }

    pub fn tokens(&self) -> &TokenCounter {
        &self.tokens
    }

    /// Builds a request stamped with the configured model.
    pub fn request(
        &self,
        system_text: &str,
        user_text: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> CompletionRequest {
        CompletionRequest {
            system_text: system_text.to_string(),
            user_text: user_text.to_string(),
            max_output_tokens,
            temperature,
            model_id: self.settings.model_id.clone(),
        }
    }

    /// Returns the prompt token count, or `TokenBudgetExceeded` if the prompt
    /// plus the requested output would not fit.
    pub fn check_budget(&self, request: &CompletionRequest) -> Result<usize, LlmError> {
        let prompt = format!("{}{}", request.system_text, request.user_text);
        let prompt_tokens = if request.model_id == self.tokens.model_id() {
            self.tokens.count(&prompt)
        } else {
            TokenCounter::for_model(&request.model_id).count(&prompt)
        };

        let max_output_tokens = request.max_output_tokens as usize;
        let required = prompt_tokens + max_output_tokens;
        let max_allowable_tokens = self.settings.max_allowable_tokens;
        if required > max_allowable_tokens {
            let deficit = required - max_allowable_tokens;
            warn!(
                "Token budget exceeded: prompt={} output={} limit={} deficit={}",
                prompt_tokens, max_output_tokens, max_allowable_tokens, deficit
            );
            return Err(LlmError::TokenBudgetExceeded {
                prompt_tokens,
                max_output_tokens,
                max_allowable_tokens,
                deficit,
            });
        }
        Ok(prompt_tokens)
    }

    /// Budget-checks and dispatches one completion. No retries.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let prompt_tokens = self.check_budget(request)?;

        let started = Instant::now();
        let text = tokio::time::timeout(self.settings.timeout, self.backend.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.settings.timeout))??;

        debug!(
            "{} completion succeeded: prompt_tokens={} max_output_tokens={} elapsed_ms={}",
            self.backend.name(),
            prompt_tokens,
            request.max_output_tokens,
            started.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Selects the backend implementation named by the configuration.
pub fn build_backend(config: &Config) -> Result<Arc<dyn CompletionBackend>, LlmError> {
    let backend: Arc<dyn CompletionBackend> = match config.backend {
        BackendKind::OpenAi => {
            let openai = config.openai.as_ref().ok_or_else(|| {
                LlmError::UnsupportedBackend("openai (missing OpenAI settings)".to_string())
            })?;
            Arc::new(openai::OpenAiBackend::new(
                openai.base_url.clone(),
                openai.api_key.clone(),
                config.llm_timeout,
            )?)
        }
        BackendKind::Azure => {
            let azure = config.azure.as_ref().ok_or_else(|| {
                LlmError::UnsupportedBackend("azure (missing Azure settings)".to_string())
            })?;
            Arc::new(azure::AzureChatBackend::new(
                azure.endpoint.clone(),
                azure.deployment.clone(),
                azure.api_version.clone(),
                azure.api_key.clone(),
                config.llm_timeout,
            )?)
        }
    };
    Ok(backend)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
