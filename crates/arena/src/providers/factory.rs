use reqwest::Client;

use super::base::{probe_model, CallOptions, ProviderCall};
use super::stream::{self, TokenStream};
use super::{anthropic, openai, openrouter};
use crate::errors::ArenaResult;
use crate::models::config::{Provider, ResolvedConfig};
use crate::models::message::ChatMessage;

/// Shape the call for the config's provider.
pub fn build_call(
    config: &ResolvedConfig,
    messages: &[ChatMessage],
    options: &CallOptions<'_>,
) -> ProviderCall {
    match config.provider {
        Provider::OpenAi | Provider::Custom => {
            openai::chat_completion_call(config, messages, options.mode)
        }
        Provider::Anthropic => anthropic::messages_call(config, messages, options.mode),
        Provider::OpenRouter => openrouter::chat_completion_call(config, messages, options),
    }
}

/// Issue exactly one streamed call and normalize its output.
///
/// Returns once the provider has answered with a success status, so an upstream rejection is
/// reported here rather than inside the stream.
pub async fn open_stream(
    client: &Client,
    config: &ResolvedConfig,
    messages: &[ChatMessage],
    options: &CallOptions<'_>,
) -> ArenaResult<TokenStream> {
    let call = build_call(config, messages, options);
    let response = call.send(client).await?;
    Ok(stream::from_response(response, call.format))
}

/// Issue one non-streaming call and return the model name the provider reported.
pub async fn probe(
    client: &Client,
    config: &ResolvedConfig,
    messages: &[ChatMessage],
    options: &CallOptions<'_>,
) -> ArenaResult<Option<String>> {
    let call = build_call(config, messages, options);
    let response = call.send(client).await?;
    probe_model(response).await
}
