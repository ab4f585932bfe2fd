//! Settings persisted to a flat JSON object file (global scope).

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

use super::ConfigurationStore;
use crate::AssistantError;

/// A `settings.json`-style store: one JSON object, dotted keys at top level.
pub struct JsonFileConfigurationStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonFileConfigurationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_object(&self) -> Result<Map<String, Value>, AssistantError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Map::new());
        }
        let text = tokio::fs::read_to_string(&self.path).await?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AssistantError::Host(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(AssistantError::Host(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl ConfigurationStore for JsonFileConfigurationStore {
    async fn get(&self, key: &str) -> Option<Value> {
        match self.read_object().await {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                warn!(error = %e, "settings file unreadable");
                None
            }
        }
    }

    async fn update(&self, key: &str, value: Value) -> Result<(), AssistantError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_object().await?;
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| AssistantError::Host(format!("Failed to serialize settings: {}", e)))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
