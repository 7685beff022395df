//! Normalizes provider SSE streams into a plain sequence of text fragments.
//!
//! Every provider streams server-sent events, but the payloads differ. Event framing is left
//! to `eventsource-stream`; the decoder here understands the OpenAI chat-completion chunk
//! shape (also used by OpenRouter and custom endpoints) and the Anthropic messages event
//! shape, and pulls out only the text deltas.
//! Fragments are passed on in the order they arrive, one per event, without merging.

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::fmt::Display;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::errors::{ArenaError, ArenaResult};

/// The normalized output of a chat call.
///
/// `Ok` items are text fragments, an `Err` item means the upstream failed after some output
/// may already have been forwarded, and the end of the stream is the normal terminal signal.
/// No item follows an `Err`.
pub type TokenStream = Pin<Box<dyn Stream<Item = ArenaResult<String>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    OpenAi,
    Anthropic,
}

/// Turns the data of each server-sent event into at most one text fragment.
#[derive(Debug)]
pub struct EventDecoder {
    format: WireFormat,
    done: bool,
}

impl EventDecoder {
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            done: false,
        }
    }

    /// True once the provider's end-of-stream marker was seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Decode one event's `data` field. Events that carry no text yield `None`.
    pub fn decode(&mut self, data: &str) -> ArenaResult<Option<String>> {
        if self.format == WireFormat::OpenAi && data.trim() == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let payload: Value = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(_) => {
                warn!("Failed to parse stream event: '{}'", data);
                return Ok(None);
            }
        };

        let decoded = match self.format {
            WireFormat::OpenAi => self.decode_openai(&payload),
            WireFormat::Anthropic => self.decode_anthropic(&payload),
        };
        if decoded.is_err() {
            self.done = true;
        }
        decoded
    }

    fn decode_openai(&self, payload: &Value) -> ArenaResult<Option<String>> {
        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            return Err(ArenaError::Stream(error_message(error)));
        }
        let content = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        Ok(content.map(str::to_string))
    }

    fn decode_anthropic(&mut self, payload: &Value) -> ArenaResult<Option<String>> {
        match payload.get("type").and_then(Value::as_str) {
            Some("content_block_delta") => {
                let delta = payload.get("delta");
                let is_text = delta
                    .and_then(|d| d.get("type"))
                    .and_then(Value::as_str)
                    == Some("text_delta");
                let text = delta
                    .and_then(|d| d.get("text"))
                    .and_then(Value::as_str)
                    .filter(|s| is_text && !s.is_empty());
                Ok(text.map(str::to_string))
            }
            Some("message_stop") => {
                self.done = true;
                Ok(None)
            }
            Some("error") => {
                let error = payload.get("error").cloned().unwrap_or(Value::Null);
                Err(ArenaError::Stream(error_message(&error)))
            }
            other => {
                debug!("Skipping anthropic event {:?}", other);
                Ok(None)
            }
        }
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Wrap a raw SSE byte stream in a [`TokenStream`].
pub fn normalize<S, E>(bytes: S, format: WireFormat) -> TokenStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut events = Box::pin(bytes.eventsource());
        let mut decoder = EventDecoder::new(format);

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(ArenaError::Stream(e.to_string()));
                    return;
                }
            };
            match decoder.decode(&event.data) {
                Ok(Some(token)) => yield Ok(token),
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
            if decoder.is_done() {
                return;
            }
        }
    })
}

/// Normalize a successful streaming response from a provider.
pub fn from_response(response: reqwest::Response, format: WireFormat) -> TokenStream {
    normalize(response.bytes_stream(), format)
}
