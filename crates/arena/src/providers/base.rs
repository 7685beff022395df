use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use super::openrouter::SearchEngine;
use super::stream::WireFormat;
use crate::errors::{ArenaError, ArenaResult, UpstreamError};

/// `max_tokens` for Anthropic chat calls, which require an explicit limit.
pub const CHAT_MAX_TOKENS: u32 = 4096;
/// `max_tokens` for configuration probes.
pub const PROBE_MAX_TOKENS: u32 = 50;
/// The single user message sent by a configuration probe.
pub const PROBE_PROMPT: &str = "Hello";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// A streamed chat completion.
    Stream,
    /// A small non-streaming completion used to check a config.
    Probe,
}

/// Per-call settings that do not come from the model config.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions<'a> {
    pub mode: CallMode,
    /// OpenRouter web search engine; ignored by every other provider.
    pub search: Option<SearchEngine>,
    /// `HTTP-Referer` for OpenRouter.
    pub referer: &'a str,
}

impl<'a> CallOptions<'a> {
    pub fn stream(referer: &'a str) -> Self {
        Self {
            mode: CallMode::Stream,
            search: None,
            referer,
        }
    }

    pub fn probe(referer: &'a str) -> Self {
        Self {
            mode: CallMode::Probe,
            search: None,
            referer,
        }
    }

    pub fn with_search(self, search: Option<SearchEngine>) -> Self {
        Self { search, ..self }
    }
}

/// One fully shaped provider request, ready to send.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
    pub format: WireFormat,
}

impl ProviderCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Issue the request. Any non-2xx status is decoded into an [`UpstreamError`].
    pub async fn send(&self, client: &Client) -> ArenaResult<Response> {
        debug!("Sending request to {}", self.url);

        let mut request = client.post(&self.url).json(&self.body);
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ArenaError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ArenaError::Upstream(UpstreamError::from_body(
            status.as_u16(),
            status.canonical_reason(),
            &body,
        )))
    }
}

/// Read the `model` field reported by a non-streaming completion.
pub async fn probe_model(response: Response) -> ArenaResult<Option<String>> {
    let body: Value = response
        .json()
        .await
        .map_err(|e| ArenaError::Transport(format!("Invalid response from provider: {}", e)))?;
    Ok(body
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string))
}
