use crate::state::AppState;
use arena::errors::ArenaError;
use arena::models::config::Provider;
use arena::models::request::TestModelRequest;
use arena::providers::hints::openrouter_hint;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::request_referer;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestModelResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<Provider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<Value>,
}

fn failure(err: &ArenaError, provider: Provider, model_id: &str) -> TestModelResponse {
    let status = err.status_code();
    let original = err.to_string();
    let upstream = err.upstream();

    let friendly = match upstream {
        Some(upstream) if provider == Provider::OpenRouter => openrouter_hint(model_id, upstream),
        _ => original.clone(),
    };

    TestModelResponse {
        success: false,
        error: Some(friendly),
        code: upstream.and_then(|u| u.code.clone()),
        status_code: Some(status),
        original_error: Some(original),
        details: upstream.map(|u| u.details.clone()),
        model_id: Some(model_id.to_string()),
        provider: Some(provider),
        debug: Some(json!({
            "requestModelId": model_id,
            "errorType": upstream.and_then(|u| u.error_type.clone()),
            "errorCode": upstream.and_then(|u| u.code.clone()),
            "statusCode": status,
        })),
        ..Default::default()
    }
}

async fn test_model_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TestModelRequest>, JsonRejection>,
) -> Response {
    let identity = state.identity_for(&headers);
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Unreadable test request from {}: {}", identity, rejection);
            let body = TestModelResponse {
                error: Some(rejection.body_text()),
                ..Default::default()
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let config = match state
        .dispatcher
        .resolve(&identity, request.model_config)
        .await
    {
        Ok(config) => config,
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = TestModelResponse {
                error: Some(e.to_string()),
                ..Default::default()
            };
            return (status, Json(body)).into_response();
        }
    };

    match state
        .dispatcher
        .probe(&config, &request_referer(&headers))
        .await
    {
        Ok(model) => {
            info!("{} model {} is reachable", config.provider, config.model_id);
            Json(TestModelResponse {
                success: true,
                message: Some("API key and model ID are valid".to_string()),
                model,
                ..Default::default()
            })
            .into_response()
        }
        Err(e) => {
            error!(
                "Testing {} model {} failed: {}",
                config.provider, config.model_id, e
            );
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = failure(&e, config.provider, &config.model_id);
            (status, Json(body)).into_response()
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/test-model", post(test_model_handler))
        .with_state(state)
}
