// Export route modules
pub mod chat;
pub mod status;
pub mod test_model;

use crate::state::AppState;
use axum::http::HeaderMap;
use axum::Router;

use arena::providers::openrouter::referer_from_headers;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(test_model::routes(state))
        .merge(status::routes())
}

/// The referer to report to OpenRouter, taken from the inbound request.
fn request_referer(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    referer_from_headers(header("origin"), header("referer"))
}
