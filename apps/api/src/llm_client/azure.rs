// Enterprise-hosted chat backend. The deployment in the URL selects the model,
// so the request body carries no model field.

use std::time::Duration;

use async_trait::async_trait;

use super::chat::{send_chat, ChatRequest};
use super::{CompletionBackend, CompletionRequest, LlmError};

pub const DEFAULT_API_VERSION: &str = "2024-06-01";

#[derive(Debug, Clone)]
pub struct AzureChatBackend {
    http: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    timeout: Duration,
}

impl AzureChatBackend {
    pub fn new(
        endpoint: String,
        deployment: String,
        api_version: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Generation(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment,
            api_version,
            api_key,
            timeout,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }
}

#[async_trait]
impl CompletionBackend for AzureChatBackend {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let builder = self
            .http
            .post(self.url())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key);
        let body = ChatRequest::from_request(request, false);
        send_chat(builder, &body, self.name(), self.timeout).await
    }
}
