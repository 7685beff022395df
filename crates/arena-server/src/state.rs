use anyhow::Result;
use arena::dispatcher::Dispatcher;
use arena::identity::Identity;
use arena::store::{FileModelStore, ModelStore, StaticModelStore};
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::info;

use crate::auth::{self, IdentityResolver};
use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            identity,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.client.connect_timeout())
            .build()?;

        let store: Arc<dyn ModelStore> = match &settings.store.models_path {
            Some(path) => {
                info!("Reading model configs from {}", path.display());
                Arc::new(FileModelStore::new(path))
            }
            None => Arc::new(StaticModelStore::default()),
        };

        Ok(Self::new(
            Dispatcher::new(client, store),
            auth::from_settings(&settings.auth)?,
        ))
    }

    pub fn identity_for(&self, headers: &HeaderMap) -> Identity {
        auth::resolve_identity(self.identity.as_ref(), headers)
    }
}

#[cfg(test)]
impl AppState {
    /// State over a fixed set of stored models, with callers identified by `x-user`.
    pub fn for_tests(models: Vec<arena::store::StoredModel>) -> Self {
        Self::new(
            Dispatcher::new(reqwest::Client::new(), Arc::new(StaticModelStore::new(models))),
            Arc::new(auth::HeaderIdentityResolver::new("x-user").expect("valid header name")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{AuthSettings, StoreSettings};
    use arena::models::config::{ModelConfigInput, Provider};
    use axum::http::HeaderValue;
    use std::io::Write;

    fn input(id: &str) -> ModelConfigInput {
        ModelConfigInput {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_models_file_backs_the_dispatcher() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            serde_json::json!({
                "models": [{
                    "id": "team-claude",
                    "name": "Team Claude",
                    "provider": "anthropic",
                    "apiKey": "ant-key",
                    "modelId": "claude-3-5-sonnet",
                    "owner": "alice",
                }]
            })
        )
        .unwrap();

        let settings = Settings {
            store: StoreSettings {
                models_path: Some(file.path().to_path_buf()),
            },
            auth: AuthSettings {
                identity_header: Some("x-user".to_string()),
            },
            ..Default::default()
        };
        let state = AppState::from_settings(&settings).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-user", HeaderValue::from_static("alice"));
        let identity = state.identity_for(&headers);
        let config = state
            .dispatcher
            .resolve(&identity, input("team-claude"))
            .await
            .unwrap();
        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.model_id, "claude-3-5-sonnet");
    }

    #[tokio::test]
    async fn test_no_models_file_means_inline_only() {
        let state = AppState::from_settings(&Settings::default()).unwrap();
        let identity = state.identity_for(&HeaderMap::new());
        assert_eq!(identity, Identity::anonymous());

        let err = state
            .dispatcher
            .resolve(&identity, input("team-claude"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("apiKey is required"));
    }
}
