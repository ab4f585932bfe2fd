//! Where schema documents come from.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::ingest::SchemaDocuments;
use crate::AssistantError;

/// Supplies the raw schema documents the catalogs are built from.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Load the current content of all three documents.
    async fn load(&self) -> Result<SchemaDocuments, AssistantError>;

    /// Whether a change notification for `uri` concerns one of this source's documents.
    fn watches(&self, uri: &str) -> bool;
}

/// Schema documents read from JSON files on disk.
#[derive(Debug, Clone)]
pub struct FileSchemaSource {
    pub settings_schema: PathBuf,
    pub keybindings_schema: PathBuf,
    pub default_keybindings: PathBuf,
}

impl FileSchemaSource {
    pub fn new(
        settings_schema: impl Into<PathBuf>,
        keybindings_schema: impl Into<PathBuf>,
        default_keybindings: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings_schema: settings_schema.into(),
            keybindings_schema: keybindings_schema.into(),
            default_keybindings: default_keybindings.into(),
        }
    }

    fn paths(&self) -> [&Path; 3] {
        [
            &self.settings_schema,
            &self.keybindings_schema,
            &self.default_keybindings,
        ]
    }
}

async fn read_json(path: &Path) -> Result<Value, AssistantError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        AssistantError::Schema(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| AssistantError::Schema(format!("Failed to parse {}: {}", path.display(), e)))
}

#[async_trait]
impl SchemaSource for FileSchemaSource {
    async fn load(&self) -> Result<SchemaDocuments, AssistantError> {
        Ok(SchemaDocuments {
            settings_schema: read_json(&self.settings_schema).await?,
            keybindings_schema: read_json(&self.keybindings_schema).await?,
            default_keybindings: read_json(&self.default_keybindings).await?,
        })
    }

    fn watches(&self, uri: &str) -> bool {
        let candidate = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
        self.paths().iter().any(|p| *p == candidate)
    }
}

/// In-memory documents. Useful for embedding hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    docs: SchemaDocuments,
}

/// Pseudo-URIs a [`StaticSchemaSource`] answers to.
pub const STATIC_SCHEMA_URIS: [&str; 3] = [
    "schema://settings/default",
    "schema://keybindings",
    "schema://keybindings/default",
];

impl StaticSchemaSource {
    pub fn new(docs: SchemaDocuments) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn load(&self) -> Result<SchemaDocuments, AssistantError> {
        Ok(self.docs.clone())
    }

    fn watches(&self, uri: &str) -> bool {
        STATIC_SCHEMA_URIS.contains(&uri)
    }
}
