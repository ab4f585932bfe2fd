use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::catalog::Setting;
use crate::host::{ConfigurationStore, ConfirmationGate, ConfirmationItem, ConfirmationRequest};
use crate::index::ConfigurationIndex;
use crate::session::{MutationLedger, SettingChange, TurnContext};

use super::{input_schema, parse_input, Tool, ToolFailure, ToolPolicy, ToolResult, ToolStatus};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateSettingsInput {
    /// Setting keys mapped to the requested new values, e.g. {"editor.fontSize": 16}
    pub settings: Map<String, Value>,
}

/// A write that the store rejected; the rest of the batch was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedUpdate {
    pub key: String,
    pub reason: String,
}

/// Machine-readable outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateSummary {
    pub updated: Vec<SettingChange>,
    pub unchanged: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedUpdate>,
}

impl UpdateSummary {
    /// Human-readable sentence for the model to restate.
    pub fn sentence(&self) -> String {
        let mut parts = Vec::new();
        if !self.updated.is_empty() {
            let changes: Vec<String> = self
                .updated
                .iter()
                .map(|c| format!("`{}` from {} to {}", c.key, c.old_value, c.new_value))
                .collect();
            parts.push(format!(
                "Updated {} setting{}: {}.",
                self.updated.len(),
                plural(self.updated.len()),
                changes.join(", ")
            ));
        }
        if !self.unchanged.is_empty() {
            parts.push(format!(
                "{} setting{} already had the requested value: {}.",
                self.unchanged.len(),
                plural(self.unchanged.len()),
                backticked(&self.unchanged)
            ));
        }
        if !self.unknown.is_empty() {
            parts.push(format!(
                "Unknown setting{}: {}.",
                plural(self.unknown.len()),
                backticked(&self.unknown)
            ));
        }
        if let Some(failed) = &self.failed {
            parts.push(format!(
                "Failed to update `{}`: {}. Remaining settings were not applied.",
                failed.key, failed.reason
            ));
        }
        if parts.is_empty() {
            parts.push("No settings were changed.".into());
        }
        parts.join(" ")
    }

    fn status(&self) -> ToolStatus {
        if self.failed.is_some() {
            ToolStatus::PersistenceFailure
        } else if !self.updated.is_empty() {
            ToolStatus::Success
        } else if !self.unchanged.is_empty() {
            ToolStatus::NoOp
        } else {
            ToolStatus::NotFound
        }
    }

    fn into_result(self) -> ToolResult {
        let json = serde_json::to_string(&self).unwrap_or_default();
        ToolResult::with_status(self.status(), format!("{}\n{}", self.sentence(), json))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn backticked(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("`{}`", k))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Structural equality. Numbers compare by value so `14` equals `14.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Writes settings at global scope, diffing against the live values first.
pub struct UpdateSettingsTool {
    index: Arc<ConfigurationIndex>,
    store: Arc<dyn ConfigurationStore>,
    gate: Arc<dyn ConfirmationGate>,
    ledger: MutationLedger,
    policy: Arc<ToolPolicy>,
}

impl UpdateSettingsTool {
    pub fn new(
        index: Arc<ConfigurationIndex>,
        store: Arc<dyn ConfigurationStore>,
        gate: Arc<dyn ConfirmationGate>,
        ledger: MutationLedger,
        policy: Arc<ToolPolicy>,
    ) -> Self {
        Self {
            index,
            store,
            gate,
            ledger,
            policy,
        }
    }

    async fn update(
        &self,
        input: UpdateSettingsInput,
        ctx: &TurnContext,
    ) -> Result<ToolResult, ToolFailure> {
        if input.settings.is_empty() {
            return Err(ToolFailure::NoOp("No settings were provided to update.".into()));
        }
        if ctx.is_cancelled() {
            return Err(ToolFailure::Cancelled);
        }

        let mut summary = UpdateSummary::default();
        let mut known: Vec<(Setting, Value)> = Vec::with_capacity(input.settings.len());
        for (key, value) in input.settings {
            match self
                .index
                .get_setting(&key)
                .await
                .map_err(|e| ToolFailure::PersistenceFailure(e.to_string()))?
            {
                Some(setting) => known.push((setting, value)),
                None => summary.unknown.push(key),
            }
        }
        if known.is_empty() {
            return Err(ToolFailure::NotFound {
                kind: "Setting",
                key: summary.unknown.join(", "),
                suggestions: Vec::new(),
            });
        }

        self.confirm_restricted(&known).await?;

        for (setting, requested) in known {
            let current = self
                .store
                .get(&setting.key)
                .await
                .unwrap_or_else(|| setting.default_value.clone());
            if values_equal(&current, &requested) {
                summary.unchanged.push(setting.key);
                continue;
            }
            if let Err(e) = self.store.update(&setting.key, requested.clone()).await {
                warn!(key = %setting.key, error = %e, "setting update rejected, aborting batch");
                summary.failed = Some(FailedUpdate {
                    key: setting.key,
                    reason: e.to_string(),
                });
                break;
            }
            let change = SettingChange {
                key: setting.key,
                old_value: current,
                new_value: requested,
            };
            self.ledger.record_setting_change(change.clone()).await;
            summary.updated.push(change);
        }

        info!(
            updated = summary.updated.len(),
            unchanged = summary.unchanged.len(),
            failed = summary.failed.is_some(),
            "settings batch applied"
        );
        Ok(summary.into_result())
    }

    async fn confirm_restricted(&self, known: &[(Setting, Value)]) -> Result<(), ToolFailure> {
        let items: Vec<ConfirmationItem> = known
            .iter()
            .filter(|(setting, _)| self.policy.setting_requires_confirmation(setting))
            .map(|(setting, value)| ConfirmationItem {
                key: setting.key.clone(),
                value: value.clone(),
                description: setting.description.clone(),
            })
            .collect();
        if items.is_empty() {
            return Ok(());
        }
        let request = ConfirmationRequest {
            title: "Update restricted settings?".into(),
            message: "The assistant wants to change settings that require your approval.".into(),
            items,
        };
        if self.gate.confirm(&request).await {
            Ok(())
        } else {
            let keys: Vec<String> = request.items.into_iter().map(|i| i.key).collect();
            Err(ToolFailure::Declined(format!(
                "update of {} was not approved; no settings were changed",
                backticked(&keys)
            )))
        }
    }
}

#[async_trait]
impl Tool for UpdateSettingsTool {
    fn name(&self) -> &'static str {
        "update_settings"
    }

    fn description(&self) -> &'static str {
        "Update one or more editor settings. Takes a map of setting key to new value. \
         Values equal to the current value are left untouched. Use search_configurations \
         first to find exact keys and valid values."
    }

    fn input_schema(&self) -> Value {
        input_schema::<UpdateSettingsInput>()
    }

    #[instrument(name = "tool.update_settings", skip_all)]
    async fn invoke(&self, args: Value, ctx: &TurnContext) -> ToolResult {
        let result = match parse_input::<UpdateSettingsInput>(args) {
            Ok(input) => self.update(input, ctx).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(ToolResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IngestOptions, SchemaDocuments, StaticSchemaSource};
    use crate::host::{AlwaysDecline, AutoApprove, InMemoryConfigurationStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn index() -> Arc<ConfigurationIndex> {
        let docs = SchemaDocuments {
            settings_schema: json!({"properties": {
                "editor.fontSize": {"type": "number", "default": 14, "description": "Font size."},
                "editor.tabSize": {"type": "number", "default": 4, "description": "Tab size."},
                "security.workspace.trust.enabled": {
                    "type": "boolean",
                    "default": true,
                    "description": "Controls whether workspace trust is enabled.",
                    "restricted": true
                }
            }}),
            keybindings_schema: json!({}),
            default_keybindings: json!([]),
        };
        Arc::new(ConfigurationIndex::new(
            Arc::new(StaticSchemaSource::new(docs)),
            IngestOptions::default(),
        ))
    }

    fn tool(
        store: Arc<InMemoryConfigurationStore>,
        gate: Arc<dyn ConfirmationGate>,
        ledger: MutationLedger,
    ) -> UpdateSettingsTool {
        UpdateSettingsTool::new(index(), store, gate, ledger, Arc::new(ToolPolicy::default()))
    }

    fn ctx() -> TurnContext {
        TurnContext::new("make the font bigger", CancellationToken::new())
    }

    #[test]
    fn test_values_equal_is_structural() {
        assert!(values_equal(&json!(14), &json!(14.0)));
        assert!(values_equal(&json!({"a": [1, 2], "b": "x"}), &json!({"b": "x", "a": [1, 2]})));
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!("14"), &json!(14)));
    }

    #[tokio::test]
    async fn test_empty_mapping_is_noop() {
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        let result = tool(store, Arc::new(AutoApprove), ledger)
            .invoke(json!({"settings": {}}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::NoOp);
    }

    #[tokio::test]
    async fn test_second_identical_call_is_noop() {
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        let tool = tool(store.clone(), Arc::new(AutoApprove), ledger.clone());
        let args = json!({"settings": {"editor.fontSize": 16}});

        let first = tool.invoke(args.clone(), &ctx()).await;
        assert_eq!(first.status, ToolStatus::Success);
        assert!(first.content.contains("Updated 1 setting"));
        assert_eq!(store.get("editor.fontSize").await, Some(json!(16)));

        let second = tool.invoke(args, &ctx()).await;
        assert_eq!(second.status, ToolStatus::NoOp);
        assert!(second.content.contains("already had the requested value"));
        assert_eq!(store.write_count(), 1);
        assert_eq!(ledger.snapshot().await.settings.len(), 1);
    }

    #[tokio::test]
    async fn test_default_value_counts_as_current() {
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        let result = tool(store.clone(), Arc::new(AutoApprove), ledger.clone())
            .invoke(json!({"settings": {"editor.fontSize": 14, "editor.tabSize": 4}}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::NoOp);
        assert_eq!(store.write_count(), 0);
        assert!(ledger.snapshot().await.settings.is_empty());
    }

    #[tokio::test]
    async fn test_failure_aborts_rest_without_rollback() {
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        // Keys apply in sorted order: editor.fontSize, then editor.tabSize.
        store.reject_writes("editor.tabSize", "read-only").await;
        let result = tool(store.clone(), Arc::new(AutoApprove), ledger.clone())
            .invoke(json!({"settings": {"editor.fontSize": 18, "editor.tabSize": 2}}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::PersistenceFailure);
        assert!(result.content.contains("Failed to update `editor.tabSize`"));
        assert_eq!(store.get("editor.fontSize").await, Some(json!(18)));
        assert_eq!(ledger.snapshot().await.settings.len(), 1);
    }

    #[tokio::test]
    async fn test_restricted_setting_declined_changes_nothing() {
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        let result = tool(store.clone(), Arc::new(AlwaysDecline), ledger.clone())
            .invoke(
                json!({"settings": {"security.workspace.trust.enabled": false, "editor.fontSize": 20}}),
                &ctx(),
            )
            .await;
        assert_eq!(result.status, ToolStatus::Declined);
        assert_eq!(store.write_count(), 0);
        assert!(ledger.snapshot().await.settings.is_empty());
    }

    #[tokio::test]
    async fn test_unrestricted_batch_skips_gate() {
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        let result = tool(store, Arc::new(AlwaysDecline), ledger)
            .invoke(json!({"settings": {"editor.fontSize": 20}}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::Success);
    }

    #[tokio::test]
    async fn test_unknown_keys_reported() {
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        let tool = tool(store, Arc::new(AutoApprove), ledger);
        let result = tool
            .invoke(json!({"settings": {"editor.fontSizee": 20}}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::NotFound);

        let result = tool
            .invoke(json!({"settings": {"editor.fontSizee": 20, "editor.fontSize": 20}}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::Success);
        assert!(result.content.contains("Unknown setting: `editor.fontSizee`"));
    }

    #[tokio::test]
    async fn test_cancelled_before_batch() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ledger = MutationLedger::new();
        let store = Arc::new(InMemoryConfigurationStore::new());
        let result = tool(store.clone(), Arc::new(AutoApprove), ledger)
            .invoke(
                json!({"settings": {"editor.fontSize": 20}}),
                &TurnContext::new("r", cancel),
            )
            .await;
        assert_eq!(result.status, ToolStatus::Cancelled);
        assert_eq!(store.write_count(), 0);
    }
}
