//! Entry point shared by the chat and test-configuration endpoints.
//!
//! A request goes through the same steps either way: find the effective model config,
//! validate it, and hand it to the provider adapter. Chat calls return the normalized token
//! stream, and for OpenRouter with web search they run through the fallback chain. Test
//! calls send a small non-streaming probe instead.

use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::errors::ArenaResult;
use crate::identity::Identity;
use crate::models::config::{effective_config, ModelConfigInput, Provider, ResolvedConfig};
use crate::models::message::ChatMessage;
use crate::providers::base::{CallOptions, PROBE_PROMPT};
use crate::providers::factory;
use crate::providers::fallback;
use crate::providers::stream::TokenStream;
use crate::store::ModelStore;

pub struct Dispatcher {
    client: Client,
    store: Arc<dyn ModelStore>,
}

impl Dispatcher {
    pub fn new(client: Client, store: Arc<dyn ModelStore>) -> Self {
        Self { client, store }
    }

    /// Look up a stored config when the input names one, pick the effective config and
    /// validate it. Nothing here touches a provider.
    pub async fn resolve(
        &self,
        identity: &Identity,
        input: ModelConfigInput,
    ) -> ArenaResult<ResolvedConfig> {
        let stored = match input.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => self.store.resolve(identity, id).await?,
            None => None,
        };
        effective_config(stored, input).resolve()
    }

    /// Start a streamed chat completion.
    ///
    /// Web search only applies to OpenRouter; for every other provider the flag is ignored
    /// and exactly one call is made.
    pub async fn stream_chat(
        &self,
        config: &ResolvedConfig,
        messages: &[ChatMessage],
        enable_web_search: bool,
        referer: &str,
    ) -> ArenaResult<TokenStream> {
        info!(
            "Dispatching chat to {} model {} ({} messages)",
            config.provider,
            config.model_id,
            messages.len()
        );
        let options = CallOptions::stream(referer);

        if enable_web_search && config.provider == Provider::OpenRouter {
            let client = &self.client;
            fallback::run(&config.model_id, |tier| {
                let options = options.with_search(tier.engine());
                async move { factory::open_stream(client, config, messages, &options).await }
            })
            .await
        } else {
            factory::open_stream(&self.client, config, messages, &options).await
        }
    }

    /// Check a config with one small completion and return the model the provider reported.
    pub async fn probe(
        &self,
        config: &ResolvedConfig,
        referer: &str,
    ) -> ArenaResult<Option<String>> {
        info!("Testing {} model {}", config.provider, config.model_id);
        let messages = [ChatMessage::user(PROBE_PROMPT)];
        factory::probe(&self.client, config, &messages, &CallOptions::probe(referer)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ArenaError;
    use crate::models::config::ModelConfig;
    use crate::providers::openrouter::DEFAULT_REFERER;
    use crate::store::{StaticModelStore, StoredModel};
    use futures::StreamExt;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    const OPENAI_SSE: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Client::new(), Arc::new(StaticModelStore::default()))
    }

    fn inline(provider: &str, base_url: &str) -> ModelConfigInput {
        ModelConfigInput {
            provider: Some(provider.to_string()),
            api_key: Some("test-key".to_string()),
            base_url: Some(base_url.to_string()),
            model_id: Some("openai/gpt-4o".to_string()),
            ..Default::default()
        }
    }

    fn sse(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
    }

    /// Matches request bodies that carry no `plugins` field.
    struct WithoutPlugins;

    impl Match for WithoutPlugins {
        fn matches(&self, request: &Request) -> bool {
            serde_json::from_slice::<Value>(&request.body)
                .map(|body| body.get("plugins").is_none())
                .unwrap_or(false)
        }
    }

    async fn collect(stream: TokenStream) -> Vec<String> {
        stream.map(|t| t.unwrap()).collect().await
    }

    async fn engines_sent(server: &MockServer) -> Vec<Option<String>> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_slice(&r.body).unwrap();
                body["plugins"][0]["engine"].as_str().map(str::to_string)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_call_per_openai_style_provider() {
        for provider in ["openai", "custom", "openrouter"] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .and(header("authorization", "Bearer test-key"))
                .respond_with(sse(OPENAI_SSE))
                .expect(1)
                .mount(&server)
                .await;

            let dispatcher = dispatcher();
            let config = dispatcher
                .resolve(&Identity::anonymous(), inline(provider, &server.uri()))
                .await
                .unwrap();
            let stream = dispatcher
                .stream_chat(&config, &[ChatMessage::user("Hi")], false, DEFAULT_REFERER)
                .await
                .unwrap();
            assert_eq!(collect(stream).await, vec!["Hi", " there"]);
        }
    }

    #[tokio::test]
    async fn test_one_call_for_anthropic() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Bonjour\"}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({"system": "S", "max_tokens": 4096})))
            .respond_with(sse(body))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let config = dispatcher
            .resolve(&Identity::anonymous(), inline("anthropic", &server.uri()))
            .await
            .unwrap();
        let messages = [ChatMessage::system("S"), ChatMessage::user("U")];
        // web search is ignored outside OpenRouter
        let stream = dispatcher
            .stream_chat(&config, &messages, true, DEFAULT_REFERER)
            .await
            .unwrap();
        assert_eq!(collect(stream).await, vec!["Bonjour"]);
    }

    #[tokio::test]
    async fn test_missing_api_key_never_calls_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sse(OPENAI_SSE))
            .expect(0)
            .mount(&server)
            .await;

        let mut input = inline("openai", &server.uri());
        input.api_key = None;
        let err = dispatcher()
            .resolve(&Identity::anonymous(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, ArenaError::Validation(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_stored_config_is_scoped_to_identity() {
        let alice = Identity::new("alice");
        let stored = ModelConfig {
            id: "cfg-1".to_string(),
            name: "Mine".to_string(),
            provider: Provider::OpenAi,
            api_key: "stored-key".to_string(),
            base_url: Some("http://stored".to_string()),
            model_id: "gpt-4o".to_string(),
        };
        let dispatcher = Dispatcher::new(
            Client::new(),
            Arc::new(StaticModelStore::new(vec![StoredModel::owned_by(
                stored, &alice,
            )])),
        );
        let by_id = ModelConfigInput {
            id: Some("cfg-1".to_string()),
            ..Default::default()
        };

        let config = dispatcher.resolve(&alice, by_id.clone()).await.unwrap();
        assert_eq!(config.api_key, "stored-key");
        assert_eq!(config.base_url, "http://stored");

        // someone else falls back to the (empty) inline config
        let err = dispatcher
            .resolve(&Identity::anonymous(), by_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ArenaError::Validation(_)));
    }

    #[tokio::test]
    async fn test_openrouter_without_search_sends_no_plugin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(WithoutPlugins)
            .and(header("X-Title", "Model Arena"))
            .and(header("HTTP-Referer", "https://arena.example"))
            .respond_with(sse(OPENAI_SSE))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let config = dispatcher
            .resolve(&Identity::anonymous(), inline("openrouter", &server.uri()))
            .await
            .unwrap();
        let stream = dispatcher
            .stream_chat(&config, &[ChatMessage::user("Hi")], false, "https://arena.example")
            .await
            .unwrap();
        assert_eq!(collect(stream).await.len(), 2);
    }

    #[tokio::test]
    async fn test_native_unsupported_falls_back_to_exa() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"plugins": [{"id": "web", "engine": "native"}]})))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"message": "No endpoints found that support native web search", "code": 404}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"plugins": [{"id": "web", "engine": "exa"}]})))
            .respond_with(sse(OPENAI_SSE))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(WithoutPlugins)
            .respond_with(sse(OPENAI_SSE))
            .expect(0)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let config = dispatcher
            .resolve(&Identity::anonymous(), inline("openrouter", &server.uri()))
            .await
            .unwrap();
        let stream = dispatcher
            .stream_chat(&config, &[ChatMessage::user("news?")], true, DEFAULT_REFERER)
            .await
            .unwrap();
        assert_eq!(collect(stream).await, vec!["Hi", " there"]);
        assert_eq!(
            engines_sent(&server).await,
            vec![Some("native".to_string()), Some("exa".to_string())]
        );
    }

    #[tokio::test]
    async fn test_rate_limited_native_skips_exa() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"plugins": [{"engine": "native"}]})))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit exceeded", "code": 429}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"plugins": [{"engine": "exa"}]})))
            .respond_with(sse(OPENAI_SSE))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(WithoutPlugins)
            .respond_with(sse(OPENAI_SSE))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let config = dispatcher
            .resolve(&Identity::anonymous(), inline("openrouter", &server.uri()))
            .await
            .unwrap();
        let stream = dispatcher
            .stream_chat(&config, &[ChatMessage::user("news?")], true, DEFAULT_REFERER)
            .await
            .unwrap();
        assert_eq!(collect(stream).await.len(), 2);
        assert_eq!(
            engines_sent(&server).await,
            vec![Some("native".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_all_tiers_failing_returns_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Provider returned error", "code": 400}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let config = dispatcher
            .resolve(&Identity::anonymous(), inline("openrouter", &server.uri()))
            .await
            .unwrap();
        let err = match dispatcher
            .stream_chat(&config, &[ChatMessage::user("news?")], true, DEFAULT_REFERER)
            .await
        {
            Err(err) => err,
            Ok(_) => panic!("Expected the chain to fail"),
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Provider returned error");
    }

    #[tokio::test]
    async fn test_probe_is_repeatable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "max_tokens": 50,
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-123",
                "object": "chat.completion",
                "model": "gpt-4o-2024-08-06",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi!"}, "finish_reason": "stop"}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let config = dispatcher
            .resolve(&Identity::anonymous(), inline("openai", &server.uri()))
            .await
            .unwrap();
        for _ in 0..2 {
            let model = dispatcher.probe(&config, DEFAULT_REFERER).await.unwrap();
            assert_eq!(model.as_deref(), Some("gpt-4o-2024-08-06"));
        }
    }
}
