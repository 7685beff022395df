//! Human-readable guidance for OpenRouter failures.
//!
//! OpenRouter relays errors from many upstream providers with little structure. These hints
//! are keyed on the status and on phrases seen in its messages; they are a UX aid only and
//! may not match every failure.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::UpstreamError;

const MODELS_PAGE: &str = "https://openrouter.ai/models";

lazy_static! {
    static ref NOT_FOUND: Regex = Regex::new(r"(?i)not (available|found)").unwrap();
    static ref UNAUTHORIZED: Regex =
        Regex::new(r"(?i)(incorrect )?api key|unauthorized").unwrap();
    static ref BAD_REQUEST: Regex =
        Regex::new(r"(?i)provider returned error|bad request").unwrap();
    static ref RATE_LIMIT: Regex = Regex::new(r"(?i)rate.?limit").unwrap();
}

pub fn openrouter_hint(model_id: &str, error: &UpstreamError) -> String {
    let message = error.message.as_str();
    let status = error.status;

    if status == 404 || NOT_FOUND.is_match(message) {
        format!(
            "Model \"{}\" is not available on OpenRouter. The id may be misspelled, the model may \
             have been removed, or it may need special access. Search {} to confirm the id.",
            model_id, MODELS_PAGE
        )
    } else if status == 401 || UNAUTHORIZED.is_match(message) {
        format!(
            "OpenRouter rejected the credentials. Check that the API key is correct and that it \
             has access to \"{}\"; some models need a particular subscription tier.",
            model_id
        )
    } else if status == 400 || BAD_REQUEST.is_match(message) {
        format!(
            "The request for \"{}\" failed: {}. The model id may be wrong or the model may be \
             temporarily unavailable. See {} for available models.",
            model_id, message, MODELS_PAGE
        )
    } else if status == 429 || RATE_LIMIT.is_match(message) {
        "Too many requests. Wait a moment and try again.".to_string()
    } else {
        format!(
            "OpenRouter returned an error for \"{}\" (status {}): {}. Check the model id or see {}.",
            model_id, status, message, MODELS_PAGE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(status: u16, message: &str) -> UpstreamError {
        UpstreamError::from_body(
            status,
            None,
            &serde_json::json!({"error": {"message": message}}).to_string(),
        )
    }

    #[test]
    fn test_hint_categories() {
        assert!(openrouter_hint("a/b", &error(404, "x")).contains("not available"));
        assert!(openrouter_hint("a/b", &error(500, "Model not found")).contains("not available"));
        assert!(openrouter_hint("a/b", &error(403, "Incorrect API key")).contains("credentials"));
        assert!(openrouter_hint("a/b", &error(400, "x")).contains("The request for \"a/b\""));
        assert!(openrouter_hint("a/b", &error(503, "Rate limit hit")).contains("Too many"));
        assert!(openrouter_hint("a/b", &error(503, "overloaded")).contains("status 503"));
    }
}
