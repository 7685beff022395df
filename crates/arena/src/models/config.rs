use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::{ArenaError, ArenaResult};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// The closed set of backends a model config can point at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    OpenRouter,
    Custom,
}

impl Provider {
    /// The base url used when a config leaves `baseUrl` empty. `Custom` has none.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some(OPENAI_BASE_URL),
            Provider::Anthropic => Some(ANTHROPIC_BASE_URL),
            Provider::OpenRouter => Some(OPENROUTER_BASE_URL),
            Provider::Custom => None,
        }
    }
}

/// A stored model configuration, as kept by the config store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub id: String,
    pub name: String,
    pub provider: Provider,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model_id: String,
}

/// The model config as the browser sends it: either a reference by `id`, a full inline
/// config, or a mix of both. Every field is optional so that gaps become validation errors
/// rather than JSON errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfigInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

impl From<ModelConfig> for ModelConfigInput {
    fn from(config: ModelConfig) -> Self {
        ModelConfigInput {
            id: Some(config.id),
            name: Some(config.name),
            provider: Some(config.provider.to_string()),
            api_key: Some(config.api_key),
            base_url: config.base_url,
            model_id: Some(config.model_id),
        }
    }
}

/// Pick the configuration a request runs with.
///
/// A stored config found by id replaces the inline one entirely; fields are never merged.
/// Without a stored match the inline config is used as sent.
pub fn effective_config(stored: Option<ModelConfig>, inline: ModelConfigInput) -> ModelConfigInput {
    match stored {
        Some(config) => config.into(),
        None => inline,
    }
}

/// A validated config with every field needed to issue a call.
#[derive(Clone, PartialEq)]
pub struct ResolvedConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ModelConfigInput {
    /// Validate the config and fill in the provider's default base url.
    ///
    /// Checks run in a fixed order: credentials and model id, then provider, then the
    /// custom provider's base url.
    pub fn resolve(&self) -> ArenaResult<ResolvedConfig> {
        let api_key = non_empty(&self.api_key).ok_or_else(|| {
            ArenaError::Validation("Missing model configuration: apiKey is required".to_string())
        })?;
        let model_id = non_empty(&self.model_id).ok_or_else(|| {
            ArenaError::Validation("Missing model configuration: modelId is required".to_string())
        })?;

        let provider = match non_empty(&self.provider) {
            Some(name) => name
                .parse::<Provider>()
                .map_err(|_| ArenaError::Validation(format!("Invalid provider: {}", name)))?,
            None => return Err(ArenaError::Validation("Invalid provider".to_string())),
        };

        let base_url = match (non_empty(&self.base_url), provider.default_base_url()) {
            (Some(url), _) => url,
            (None, Some(default)) => default,
            (None, None) => {
                return Err(ArenaError::Validation(
                    "Missing baseUrl for custom provider".to_string(),
                ))
            }
        };

        Ok(ResolvedConfig {
            provider,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
        })
    }
}
