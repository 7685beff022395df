use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A non-success response from a provider, decoded from whichever error shape it used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamError {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub details: Value,
}

impl UpstreamError {
    /// Decode an error body. Understands `{"error": {"message", "type", "code"}}` as used by
    /// OpenAI and OpenRouter, and `{"type": "error", "error": {"type", "message"}}` as used by
    /// Anthropic. Anything else becomes the message as-is.
    pub fn from_body(status: u16, reason: Option<&str>, body: &str) -> Self {
        let fallback_message = || {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                reason.unwrap_or("Provider returned error").to_string()
            } else {
                trimmed.to_string()
            }
        };

        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed
            .as_ref()
            .and_then(|v| v.get("error"))
            .filter(|e| e.is_object());

        match error {
            Some(error) => {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(fallback_message);
                let code = error.get("code").and_then(|c| match c {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
                let error_type = error
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                UpstreamError {
                    status,
                    message,
                    code,
                    error_type,
                    details: error.clone(),
                }
            }
            None => UpstreamError {
                status,
                message: fallback_message(),
                code: None,
                error_type: None,
                details: parsed.unwrap_or(Value::Null),
            },
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.status == 401
            || self.code.as_deref() == Some("invalid_api_key")
            || self.error_type.as_deref() == Some("authentication_error")
    }

    /// OpenRouter answers 404 when a model has no endpoint able to run the native search engine.
    pub fn is_native_search_unsupported(&self) -> bool {
        self.status == 404 && self.message.to_lowercase().contains("native web search")
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ArenaError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", .0.message)]
    Upstream(UpstreamError),

    #[error("Failed to reach provider: {0}")]
    Transport(String),

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Model store error: {0}")]
    Store(String),
}

impl ArenaError {
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            ArenaError::Upstream(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.upstream().is_some_and(UpstreamError::is_authentication)
    }

    pub fn is_native_search_unsupported(&self) -> bool {
        self.upstream()
            .is_some_and(UpstreamError::is_native_search_unsupported)
    }

    /// The HTTP status this error should be reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            ArenaError::Validation(_) => 400,
            _ if self.is_authentication() => 401,
            ArenaError::Upstream(err) if (400..600).contains(&err.status) => err.status,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for ArenaError {
    fn from(err: reqwest::Error) -> Self {
        ArenaError::Transport(err.to_string())
    }
}

pub type ArenaResult<T> = Result<T, ArenaError>;
