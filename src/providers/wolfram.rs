//! Wolfram|Alpha Short Answers API client.
//!
//! See: <https://products.wolframalpha.com/short-answers-api/documentation>
//!
//! The Short Answers endpoint returns a single line of plain text. When the
//! engine cannot interpret or answer a query it responds `501` with an
//! explanatory body; that outcome maps to
//! [`FactDeclined`](crate::MuninnError::FactDeclined) and is cached like an
//! answer, because "no answer exists here" is itself stable information.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::retry::with_retry;
use super::traits::FactSource;
use crate::config::RetryConfig;
use crate::{MuninnError, Result};

/// Default base URL for the Wolfram|Alpha API
const DEFAULT_BASE_URL: &str = "https://api.wolframalpha.com";

/// Client for the Wolfram|Alpha Short Answers API.
#[derive(Clone)]
pub struct WolframAlphaSource {
    app_id: String,
    http: Client,
    base_url: String,
    endpoint_tag: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl WolframAlphaSource {
    /// Create a new client with the given application ID.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self::with_base_url(app_id, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(app_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .build()
            .expect("failed to build HTTP client");
        let base_url = base_url.into();

        Self {
            app_id: app_id.into(),
            http,
            endpoint_tag: format!("wolfram-alpha:{base_url}"),
            base_url,
            timeout: Duration::from_secs(7),
            retry: RetryConfig::default(),
        }
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

    async fn send_query(&self, query: &str) -> Result<String> {
        let url = format!("{}/v1/result", self.base_url);

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("i", query),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| MuninnError::Http(e.to_string()))?;

        let status = response.status();
        super::record_request("wolfram-alpha", "fact", status.is_success());

        // The body matters on both paths: answer text on 200, the engine's
        // explanation on 501.
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .await
            .map_err(|e| MuninnError::Http(e.to_string()))?;

        if status.is_success() {
            let answer = body.trim();
            if answer.is_empty() {
                return Err(MuninnError::EmptyResponse);
            }
            return Ok(answer.to_string());
        }

        match status.as_u16() {
            501 => {
                let message = if body.trim().is_empty() {
                    "query not understood".to_string()
                } else {
                    body.trim().to_string()
                };
                Err(MuninnError::FactDeclined(message))
            }
            400 => Err(MuninnError::InvalidInput(format!(
                "Wolfram|Alpha rejected the query: {}",
                body.trim()
            ))),
            403 => Err(MuninnError::AuthenticationFailed),
            429 => Err(MuninnError::RateLimited { retry_after }),
            code => Err(MuninnError::Api {
                status: code,
                message: format!("Wolfram|Alpha API error: {status}"),
            }),
        }
    }
}

#[async_trait]
impl FactSource for WolframAlphaSource {
    fn name(&self) -> &str {
        "wolfram-alpha"
    }

    fn endpoint_tag(&self) -> &str {
        &self.endpoint_tag
    }

    async fn lookup(&self, query: &str) -> Result<String> {
        with_retry(&self.retry, self.name(), "fact", || self.send_query(query)).await
    }
}
