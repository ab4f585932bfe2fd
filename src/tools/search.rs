use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::catalog::CatalogEntry;
use crate::host::ConfigurationStore;
use crate::index::ConfigurationIndex;
use crate::session::TurnContext;

use super::{input_schema, parse_input, Tool, ToolFailure, ToolResult};

/// Default result bound; large enough for the model to pick the best match.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchConfigurationsInput {
    /// Space-separated keywords describing the setting or command, e.g. "theme light color"
    pub keywords: String,
}

/// Searches settings and commands and reports each setting's live value.
pub struct SearchConfigurationsTool {
    index: Arc<ConfigurationIndex>,
    store: Arc<dyn ConfigurationStore>,
    limit: usize,
}

impl SearchConfigurationsTool {
    pub fn new(index: Arc<ConfigurationIndex>, store: Arc<dyn ConfigurationStore>) -> Self {
        Self {
            index,
            store,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    async fn search(
        &self,
        input: SearchConfigurationsInput,
        ctx: &TurnContext,
    ) -> Result<ToolResult, ToolFailure> {
        let keywords = input.keywords.trim();
        if keywords.is_empty() {
            return Err(ToolFailure::InvalidArguments(
                "keywords must not be empty".into(),
            ));
        }
        if ctx.is_cancelled() {
            return Err(ToolFailure::Cancelled);
        }

        let entries = self
            .index
            .search(keywords, self.limit)
            .await
            .map_err(|e| ToolFailure::PersistenceFailure(e.to_string()))?;
        debug!(keywords, hits = entries.len(), "configuration search");

        if entries.is_empty() {
            return Ok(ToolResult::success(format!(
                "No settings or commands matched \"{}\". Try different keywords.",
                keywords
            )));
        }

        let mut hits = Vec::with_capacity(entries.len());
        for entry in entries {
            hits.push(self.annotate(entry).await);
        }
        let json = serde_json::to_string(&hits)
            .map_err(|e| ToolFailure::PersistenceFailure(e.to_string()))?;
        Ok(ToolResult::success(json))
    }

    /// Entry as JSON; settings gain `current_value` from the store, falling
    /// back to the schema default.
    async fn annotate(&self, entry: CatalogEntry) -> Value {
        let current = match &entry {
            CatalogEntry::Setting(setting) => Some(
                self.store
                    .get(&setting.key)
                    .await
                    .unwrap_or_else(|| setting.default_value.clone()),
            ),
            CatalogEntry::Command(_) => None,
        };
        let mut value = serde_json::to_value(&entry).unwrap_or(Value::Null);
        if let (Some(current), Value::Object(map)) = (current, &mut value) {
            map.insert("current_value".into(), current);
        }
        value
    }
}

#[async_trait]
impl Tool for SearchConfigurationsTool {
    fn name(&self) -> &'static str {
        "search_configurations"
    }

    fn description(&self) -> &'static str {
        "Search the editor's settings and commands by keywords. Returns matching settings \
         (with their current value) and commands (with their keybinding). Pass an exact \
         setting or command key to get only that entry."
    }

    fn input_schema(&self) -> Value {
        input_schema::<SearchConfigurationsInput>()
    }

    #[instrument(name = "tool.search_configurations", skip_all)]
    async fn invoke(&self, args: Value, ctx: &TurnContext) -> ToolResult {
        let result = match parse_input::<SearchConfigurationsInput>(args) {
            Ok(input) => self.search(input, ctx).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(ToolResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IngestOptions, SchemaDocuments, StaticSchemaSource};
    use crate::host::InMemoryConfigurationStore;
    use crate::tools::ToolStatus;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn tool(store: InMemoryConfigurationStore) -> SearchConfigurationsTool {
        let docs = SchemaDocuments {
            settings_schema: json!({"properties": {
                "workbench.colorTheme": {
                    "type": "string",
                    "default": "Default Dark Modern",
                    "description": "Specifies the color theme used in the workbench."
                }
            }}),
            keybindings_schema: json!({
                "enum": ["workbench.action.togglePanel"],
                "enumDescriptions": ["Toggle Panel Visibility"]
            }),
            default_keybindings: json!([{"key": "ctrl+j", "command": "workbench.action.togglePanel"}]),
        };
        let index = ConfigurationIndex::new(
            Arc::new(StaticSchemaSource::new(docs)),
            IngestOptions::default(),
        );
        SearchConfigurationsTool::new(Arc::new(index), Arc::new(store))
    }

    #[tokio::test]
    async fn test_empty_keywords_invalid() {
        let ctx = TurnContext::new("r", CancellationToken::new());
        let result = tool(InMemoryConfigurationStore::new())
            .invoke(json!({"keywords": "  "}), &ctx)
            .await;
        assert_eq!(result.status, ToolStatus::InvalidArguments);
    }

    #[tokio::test]
    async fn test_settings_annotated_with_live_value() {
        let store = InMemoryConfigurationStore::with_values([(
            "workbench.colorTheme".to_string(),
            json!("Solarized Light"),
        )]);
        let ctx = TurnContext::new("r", CancellationToken::new());
        let result = tool(store)
            .invoke(json!({"keywords": "color theme"}), &ctx)
            .await;
        assert!(result.is_success());
        let hits: Vec<Value> = serde_json::from_str(&result.content).unwrap();
        let theme = hits
            .iter()
            .find(|h| h["key"] == "workbench.colorTheme")
            .unwrap();
        assert_eq!(theme["current_value"], "Solarized Light");
    }

    #[tokio::test]
    async fn test_default_used_when_store_empty_and_commands_untouched() {
        let ctx = TurnContext::new("r", CancellationToken::new());
        let tool = tool(InMemoryConfigurationStore::new());
        let result = tool
            .invoke(json!({"keywords": "workbench.colorTheme"}), &ctx)
            .await;
        let hits: Vec<Value> = serde_json::from_str(&result.content).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["current_value"], "Default Dark Modern");

        let result = tool
            .invoke(json!({"keywords": "workbench.action.togglePanel"}), &ctx)
            .await;
        let hits: Vec<Value> = serde_json::from_str(&result.content).unwrap();
        assert!(hits[0].get("current_value").is_none());
        assert_eq!(hits[0]["keybinding"], "ctrl+j");
    }

    #[tokio::test]
    async fn test_cancelled_before_search() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = TurnContext::new("r", cancel);
        let result = tool(InMemoryConfigurationStore::new())
            .invoke(json!({"keywords": "theme"}), &ctx)
            .await;
        assert_eq!(result.status, ToolStatus::Cancelled);
    }
}
