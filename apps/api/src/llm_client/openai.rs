// Direct completion backend: POST {base_url}/chat/completions with bearer auth.

use std::time::Duration;

use async_trait::async_trait;

use super::chat::{send_chat, ChatRequest};
use super::{CompletionBackend, CompletionRequest, LlmError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiBackend {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Generation(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let builder = self.http.post(url).bearer_auth(&self.api_key);
        let body = ChatRequest::from_request(request, true);
        send_chat(builder, &body, self.name(), self.timeout).await
    }
}
