// Chat-completions wire types shared by both backends.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{CompletionRequest, LlmError};

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    /// Omitted for deployment-addressed backends, where the URL names the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    pub(super) fn from_request(request: &'a CompletionRequest, include_model: bool) -> Self {
        Self {
            model: include_model.then_some(request.model_id.as_str()),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_text,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Sends a prepared request and normalizes the reply to the first choice's text.
pub(super) async fn send_chat(
    builder: reqwest::RequestBuilder,
    body: &ChatRequest<'_>,
    backend: &str,
    timeout: Duration,
) -> Result<String, LlmError> {
    let response = builder.json(body).send().await.map_err(|e| {
        if e.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Generation(format!("{backend} request failed: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|env| env.error.message)
            .unwrap_or(text);
        return Err(LlmError::Generation(format!(
            "{backend} returned {}: {message}",
            status.as_u16()
        )));
    }

    let parsed: ChatResponse = response.json().await.map_err(|e| {
        if e.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Generation(format!("{backend} response was not valid JSON: {e}"))
        }
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| LlmError::Generation(format!("{backend} returned no content")))
}
