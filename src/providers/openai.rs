//! OpenAI-compatible chat completion client.
//!
//! Works against any server exposing the `/v1/chat/completions` surface:
//! the hosted OpenAI API, llama.cpp, vLLM, LM Studio, ollama. Local servers
//! typically run without authentication, so the API key is optional.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::retry::with_retry;
use super::traits::ChatModel;
use crate::config::RetryConfig;
use crate::types::Message;
use crate::{MuninnError, Result};

/// Default base URL for the hosted OpenAI API
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for OpenAI-compatible chat completion endpoints.
///
/// ```rust
/// # use muninn::providers::OpenAiChatModel;
/// # use std::time::Duration;
/// let model = OpenAiChatModel::new("gpt-4o-mini")
///     .api_key("sk-test")
///     .timeout(Duration::from_secs(60));
/// ```
#[derive(Clone)]
pub struct OpenAiChatModel {
    model: String,
    api_key: Option<String>,
    http: Client,
    base_url: String,
    endpoint_tag: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl OpenAiChatModel {
    /// Create a new client for the hosted OpenAI API.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_base_url(model, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (local servers, wiremock).
    pub fn with_base_url(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .build()
            .expect("failed to build HTTP client");
        let model = model.into();
        let base_url = base_url.into();

        Self {
            endpoint_tag: format!("openai:{base_url}:{model}"),
            model,
            api_key: None,
            http,
            base_url,
            timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
        }
    }

    /// Set the API key sent as a bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn send_chat_request(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut request = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages,
            });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| MuninnError::Http(e.to_string()))?;

        super::record_request("openai", "chat", response.status().is_success());
        self.handle_response_errors(&response)?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| MuninnError::Http(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(MuninnError::EmptyResponse);
        }
        Ok(content)
    }

    /// Check response status and map to appropriate error.
    fn handle_response_errors(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 => Err(MuninnError::AuthenticationFailed),
            429 => {
                // Try to parse retry-after header
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(MuninnError::RateLimited { retry_after })
            }
            code => Err(MuninnError::Api {
                status: code,
                message: format!("chat completion API error: {status}"),
            }),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        "openai"
    }

    fn endpoint_tag(&self) -> &str {
        &self.endpoint_tag
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        with_retry(&self.retry, self.name(), "chat", || {
            self.send_chat_request(messages)
        })
        .await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
