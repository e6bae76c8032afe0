//! Chat-completions client for reply generation

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::ChatTurn;
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    /// Build a client with a fixed per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(endpoint: impl Into<String>, temperature: f32, max_tokens: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            temperature,
            max_tokens,
        })
    }

    /// Request one non-streaming completion for the given messages
    ///
    /// Returns the trimmed assistant content. An empty or absent completion
    /// yields an empty string rather than an error; callers decide whether
    /// silence is acceptable.
    ///
    /// # Errors
    ///
    /// Returns error on timeout, transport failure, non-success status, or
    /// an unparseable response body
    pub async fn chat(&self, model: &str, messages: &[ChatTurn]) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        tracing::debug!(model, turns = messages.len(), "LLM request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Llm(format!("completion request failed: {e}")))?;

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}
