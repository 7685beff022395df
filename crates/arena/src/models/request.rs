use serde::{Deserialize, Serialize};

use super::config::ModelConfigInput;
use super::message::ChatMessage;

/// Body of a chat call. Lives for the duration of one dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model_config: ModelConfigInput,
    #[serde(default)]
    pub enable_web_search: bool,
}

/// Body of a test-configuration call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestModelRequest {
    #[serde(default)]
    pub model_config: ModelConfigInput,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Role;
    use serde_json::json;

    #[test]
    fn test_chat_request_from_browser_json() {
        let request: ChatRequest = serde_json::from_value(json!({
            "messages": [{"id": "1", "role": "user", "content": "Hi"}],
            "modelConfig": {"provider": "openai", "apiKey": "k", "modelId": "gpt-4o"},
            "enableWebSearch": true
        }))
        .unwrap();
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.model_config.model_id.as_deref(), Some("gpt-4o"));
        assert!(request.enable_web_search);
    }

    #[test]
    fn test_optional_fields_default() {
        let request: ChatRequest = serde_json::from_value(json!({"messages": []})).unwrap();
        assert!(!request.enable_web_search);
        assert_eq!(request.model_config, ModelConfigInput::default());

        let probe: TestModelRequest = serde_json::from_value(json!({})).unwrap();
        assert!(probe.model_config.api_key.is_none());
    }
}
