use serde::Serialize;
use serde_json::{json, Value};
use strum_macros::Display;

use super::base::{CallOptions, ProviderCall};
use super::openai::chat_completion_body;
use super::stream::WireFormat;
use crate::models::config::ResolvedConfig;
use crate::models::message::ChatMessage;

pub const APP_TITLE: &str = "Model Arena";
pub const DEFAULT_REFERER: &str = "http://localhost:3000";

/// Search engines accepted by OpenRouter's `web` plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchEngine {
    Native,
    Exa,
}

pub fn web_plugin(engine: SearchEngine) -> Value {
    json!({
        "id": "web",
        "engine": engine,
    })
}

/// Derive the `HTTP-Referer` sent to OpenRouter from the inbound request headers.
///
/// `Referer` wins when present. Otherwise `Origin` is used, prefixed with `http://` when it
/// carries no scheme, and without either header the local development url is used.
pub fn referer_from_headers(origin: Option<&str>, referer: Option<&str>) -> String {
    let origin = origin.filter(|o| !o.is_empty());
    let referer = referer.filter(|r| !r.is_empty());

    if let Some(referer) = referer {
        return referer.to_string();
    }
    match origin {
        Some(origin) if origin.starts_with("http") => origin.to_string(),
        Some(origin) => format!("http://{}", origin),
        None => DEFAULT_REFERER.to_string(),
    }
}

/// Shape an OpenRouter chat completion. The model id is forwarded verbatim.
pub fn chat_completion_call(
    config: &ResolvedConfig,
    messages: &[ChatMessage],
    options: &CallOptions<'_>,
) -> ProviderCall {
    let mut body = chat_completion_body(&config.model_id, messages, options.mode);
    if let (Some(engine), Value::Object(fields)) = (options.search, &mut body) {
        fields.insert("plugins".to_string(), json!([web_plugin(engine)]));
    }

    ProviderCall {
        url: format!("{}/chat/completions", config.base_url),
        headers: vec![
            ("Authorization", format!("Bearer {}", config.api_key)),
            ("HTTP-Referer", options.referer.to_string()),
            ("X-Title", APP_TITLE.to_string()),
        ],
        body,
        format: WireFormat::OpenAi,
    }
}
