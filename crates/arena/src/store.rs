//! Read access to saved model configurations.
//!
//! Saving and editing configs happens elsewhere; the proxy only ever looks one up by id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{ArenaError, ArenaResult};
use crate::identity::Identity;
use crate::models::config::ModelConfig;

#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Find the config `id` visible to `scope`, if any.
    async fn resolve(&self, scope: &Identity, id: &str) -> ArenaResult<Option<ModelConfig>>;
}

/// A saved config plus the identity that owns it. Configs without an owner are shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    #[serde(flatten)]
    pub config: ModelConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl StoredModel {
    pub fn shared(config: ModelConfig) -> Self {
        Self {
            config,
            owner: None,
        }
    }

    pub fn owned_by(config: ModelConfig, owner: &Identity) -> Self {
        Self {
            config,
            owner: Some(owner.as_str().to_string()),
        }
    }

    fn visible_to(&self, scope: &Identity) -> bool {
        self.owner
            .as_deref()
            .map_or(true, |owner| owner == scope.as_str())
    }
}

/// The on-disk layout: `{"models": [...]}`. Other top-level keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct ModelsFile {
    #[serde(default)]
    models: Vec<StoredModel>,
}

fn find(models: &[StoredModel], scope: &Identity, id: &str) -> Option<ModelConfig> {
    models
        .iter()
        .find(|m| m.config.id == id && m.visible_to(scope))
        .map(|m| m.config.clone())
}

/// A fixed set of configs held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticModelStore {
    models: Vec<StoredModel>,
}

impl StaticModelStore {
    pub fn new(models: Vec<StoredModel>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl ModelStore for StaticModelStore {
    async fn resolve(&self, scope: &Identity, id: &str) -> ArenaResult<Option<ModelConfig>> {
        Ok(find(&self.models, scope, id))
    }
}

/// Configs read from a JSON file on every lookup, so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> ArenaResult<Vec<StoredModel>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Models file {} does not exist", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ArenaError::Store(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let file: ModelsFile = serde_json::from_str(&raw).map_err(|e| {
            ArenaError::Store(format!("failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(file.models)
    }
}

#[async_trait]
impl ModelStore for FileModelStore {
    async fn resolve(&self, scope: &Identity, id: &str) -> ArenaResult<Option<ModelConfig>> {
        let models = self.load().await?;
        let found = find(&models, scope, id);
        debug!("Lookup of model config {} for {}: found={}", id, scope, found.is_some());
        Ok(found)
    }
}
