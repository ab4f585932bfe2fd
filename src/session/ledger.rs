use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::host::ConfigurationStore;

/// One persisted setting change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingChange {
    pub key: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// One command dispatched to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRun {
    pub key: String,
    pub arguments: Vec<Value>,
}

/// Everything mutated during the current turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
    pub settings: Vec<SettingChange>,
    pub commands: Vec<CommandRun>,
}

/// Per-session record of the current turn's mutations.
///
/// Cloned handles share state. The orchestration loop clears it at the start
/// of every turn; the update and run tools append to it.
#[derive(Debug, Clone, Default)]
pub struct MutationLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MutationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new turn with an empty ledger.
    pub async fn begin_turn(&self) {
        let mut state = self.state.write().await;
        state.settings.clear();
        state.commands.clear();
    }

    pub async fn record_setting_change(&self, change: SettingChange) {
        self.state.write().await.settings.push(change);
    }

    pub async fn record_command(&self, run: CommandRun) {
        self.state.write().await.commands.push(run);
    }

    pub async fn snapshot(&self) -> LedgerState {
        self.state.read().await.clone()
    }

    /// The undo affordance for this turn: offered only when settings changed
    /// and no command ran.
    pub async fn undo_action(&self) -> Option<UndoAction> {
        let state = self.state.read().await;
        if state.settings.is_empty() || !state.commands.is_empty() {
            return None;
        }
        Some(UndoAction {
            changes: state.settings.clone(),
        })
    }
}

/// Restores the settings a turn changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoAction {
    pub changes: Vec<SettingChange>,
}

impl UndoAction {
    pub fn label(&self) -> String {
        match self.changes.len() {
            1 => format!("Undo change to {}", self.changes[0].key),
            n => format!("Undo {} setting changes", n),
        }
    }
}

/// Outcome of replaying an [`UndoAction`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UndoReport {
    pub restored: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Write every change's old value back, newest change first so a key changed
/// twice ends at its pre-turn value. Failures are collected, not fatal.
pub async fn apply_undo(store: &dyn ConfigurationStore, action: &UndoAction) -> UndoReport {
    let mut report = UndoReport::default();
    for change in action.changes.iter().rev() {
        match store.update(&change.key, change.old_value.clone()).await {
            Ok(()) => report.restored.push(change.key.clone()),
            Err(e) => {
                warn!(key = %change.key, error = %e, "undo failed for setting");
                report.failed.push((change.key.clone(), e.to_string()));
            }
        }
    }
    info!(
        restored = report.restored.len(),
        failed = report.failed.len(),
        "undo applied"
    );
    report
}
