use crate::state::AppState;
use arena::errors::ArenaError;
use arena::models::config::Provider;
use arena::models::request::ChatRequest;
use arena::providers::hints::openrouter_hint;
use arena::providers::stream::TokenStream;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tracing::{error, info, warn};

use super::request_referer;

const AUTH_HINT: &str =
    "Please check your API key in the settings. Make sure it is correct and has not expired.";

/// Streams token fragments to the client as plain text, in the order the provider sent them.
pub struct TextStreamResponse {
    tokens: TokenStream,
}

impl TextStreamResponse {
    fn new(tokens: TokenStream) -> Self {
        Self { tokens }
    }
}

impl Stream for TextStreamResponse {
    type Item = Result<Bytes, ArenaError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.tokens.as_mut().poll_next(cx).map(|opt| {
            opt.map(|item| {
                item.map(Bytes::from).map_err(|e| {
                    // Headers are already sent; all that is left is to cut the body short.
                    error!("Chat stream failed after partial output: {}", e);
                    e
                })
            })
        })
    }
}

impl IntoResponse for TextStreamResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);
        (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response()
    }
}

/// JSON body returned when a chat request fails before any output was sent.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: &'static str,
    message: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    fn from_arena(err: ArenaError, provider: Option<Provider>, model_id: &str) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_authentication() {
            return Self {
                status: StatusCode::UNAUTHORIZED,
                error: "Authentication Error",
                message: err.to_string(),
                kind: "AuthenticationError",
                code: Some("invalid_api_key".to_string()),
                hint: Some(AUTH_HINT.to_string()),
                details: None,
            };
        }

        match err {
            ArenaError::Validation(message) => Self {
                status,
                error: "Validation Error",
                message,
                kind: "ValidationError",
                code: None,
                hint: None,
                details: None,
            },
            ArenaError::Upstream(upstream) => {
                let hint = (provider == Some(Provider::OpenRouter))
                    .then(|| openrouter_hint(model_id, &upstream));
                Self {
                    status,
                    error: "API Error",
                    message: upstream.message,
                    kind: "UpstreamError",
                    code: upstream.code,
                    hint,
                    details: Some(upstream.details),
                }
            }
            ArenaError::Store(_) => Self {
                status,
                error: "API Error",
                message: "Internal Server Error".to_string(),
                kind: "StoreError",
                code: None,
                hint: None,
                details: None,
            },
            _ => Self {
                status,
                error: "API Error",
                message: "Internal Server Error".to_string(),
                kind: "TransportError",
                code: None,
                hint: None,
                details: None,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Validation Error",
            message: rejection.body_text(),
            kind: "ValidationError",
            code: None,
            hint: None,
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<TextStreamResponse, ApiError> {
    let identity = state.identity_for(&headers);
    let Json(request) = payload.map_err(|rejection| {
        warn!("Unreadable chat request from {}: {}", identity, rejection);
        ApiError::from(rejection)
    })?;
    let referer = request_referer(&headers);
    let requested_model = request.model_config.model_id.clone().unwrap_or_default();

    let config = match state
        .dispatcher
        .resolve(&identity, request.model_config)
        .await
    {
        Ok(config) => config,
        Err(e) => {
            warn!("Rejected chat request from {}: {}", identity, e);
            return Err(ApiError::from_arena(e, None, &requested_model));
        }
    };

    info!(
        "Chat request from {} for {} model {}",
        identity, config.provider, config.model_id
    );

    match state
        .dispatcher
        .stream_chat(&config, &request.messages, request.enable_web_search, &referer)
        .await
    {
        Ok(tokens) => Ok(TextStreamResponse::new(tokens)),
        Err(e) => {
            error!(
                "Chat with {} model {} failed: {}",
                config.provider, config.model_id, e
            );
            Err(ApiError::from_arena(e, Some(config.provider), &config.model_id))
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(state)
}
