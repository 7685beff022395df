use serde_json::{json, Map, Value};

use super::base::{CallMode, ProviderCall, CHAT_MAX_TOKENS, PROBE_MAX_TOKENS};
use super::stream::WireFormat;
use crate::models::config::ResolvedConfig;
use crate::models::message::{split_system, ChatMessage};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Build the messages API body. The first system message moves to the top-level `system`
/// parameter; no system message is ever left in the `messages` array.
pub fn messages_body(model: &str, messages: &[ChatMessage], mode: CallMode) -> Value {
    let (system, conversation) = split_system(messages);

    let conversation: Vec<Value> = conversation
        .into_iter()
        .map(|m| {
            json!({
                "role": m.role,
                "content": m.content,
            })
        })
        .collect();

    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert("messages".to_string(), Value::Array(conversation));
    if let Some(system) = system {
        payload.insert("system".to_string(), json!(system));
    }
    match mode {
        CallMode::Stream => {
            payload.insert("max_tokens".to_string(), json!(CHAT_MAX_TOKENS));
            payload.insert("stream".to_string(), json!(true));
        }
        CallMode::Probe => {
            payload.insert("max_tokens".to_string(), json!(PROBE_MAX_TOKENS));
        }
    }
    Value::Object(payload)
}

pub fn messages_call(
    config: &ResolvedConfig,
    messages: &[ChatMessage],
    mode: CallMode,
) -> ProviderCall {
    ProviderCall {
        url: format!("{}/v1/messages", config.base_url),
        headers: vec![
            ("x-api-key", config.api_key.clone()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ],
        body: messages_body(&config.model_id, messages, mode),
        format: WireFormat::Anthropic,
    }
}
