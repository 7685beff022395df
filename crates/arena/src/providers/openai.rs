use serde_json::{json, Map, Value};

use super::base::{CallMode, ProviderCall, PROBE_MAX_TOKENS};
use super::stream::WireFormat;
use crate::models::config::ResolvedConfig;
use crate::models::message::ChatMessage;

/// Convert messages to the chat completion `messages` array, one entry per message.
pub fn messages_to_openai_spec(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            json!({
                "role": m.role,
                "content": m.content,
            })
        })
        .collect()
}

/// The request body shared by OpenAI, custom endpoints and OpenRouter.
pub fn chat_completion_body(model: &str, messages: &[ChatMessage], mode: CallMode) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert(
        "messages".to_string(),
        Value::Array(messages_to_openai_spec(messages)),
    );
    match mode {
        CallMode::Stream => payload.insert("stream".to_string(), json!(true)),
        CallMode::Probe => payload.insert("max_tokens".to_string(), json!(PROBE_MAX_TOKENS)),
    };
    Value::Object(payload)
}

/// Shape a chat completion call for the `openai` and `custom` providers.
pub fn chat_completion_call(
    config: &ResolvedConfig,
    messages: &[ChatMessage],
    mode: CallMode,
) -> ProviderCall {
    ProviderCall {
        url: format!("{}/chat/completions", config.base_url),
        headers: vec![("Authorization", format!("Bearer {}", config.api_key))],
        body: chat_completion_body(&config.model_id, messages, mode),
        format: WireFormat::OpenAi,
    }
}
