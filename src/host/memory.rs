use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::info;

use super::{CommandExecutor, ConfigurationStore};
use crate::AssistantError;

/// Settings held in memory. Writes can be made to fail per key.
#[derive(Debug, Default)]
pub struct InMemoryConfigurationStore {
    values: RwLock<HashMap<String, Value>>,
    rejected: RwLock<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl InMemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: RwLock::new(values.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Make every later write to `key` fail with `reason`.
    pub async fn reject_writes(&self, key: &str, reason: &str) {
        self.rejected
            .write()
            .await
            .insert(key.to_string(), reason.to_string());
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.values.read().await.clone()
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryConfigurationStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.values.read().await.get(key).cloned()
    }

    async fn update(&self, key: &str, value: Value) -> Result<(), AssistantError> {
        if let Some(reason) = self.rejected.read().await.get(key) {
            return Err(AssistantError::Host(reason.clone()));
        }
        self.values.write().await.insert(key.to_string(), value);
        *self.writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

/// A command that was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCommand {
    pub command: String,
    pub args: Vec<Value>,
}

/// Records commands instead of running them. Used where no editor is attached.
#[derive(Debug, Default)]
pub struct DryRunCommandExecutor {
    executed: Mutex<Vec<ExecutedCommand>>,
    focus_requests: Mutex<usize>,
    failures: Mutex<HashMap<String, String>>,
    returns: Mutex<HashMap<String, Value>>,
}

impl DryRunCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` fail with `message` when executed.
    pub fn fail_with(&self, command: &str, message: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(command.to_string(), message.to_string());
    }

    /// Make `command` return `value` when executed.
    pub fn return_value(&self, command: &str, value: Value) {
        self.returns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(command.to_string(), value);
    }

    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn focus_requests(&self) -> usize {
        *self.focus_requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CommandExecutor for DryRunCommandExecutor {
    async fn execute(&self, command: &str, args: &[Value]) -> Result<Option<Value>, AssistantError> {
        if let Some(message) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(command)
        {
            return Err(AssistantError::Host(message.clone()));
        }
        info!(command, args = args.len(), "dry-run command execution");
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ExecutedCommand {
                command: command.to_string(),
                args: args.to_vec(),
            });
        Ok(self
            .returns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(command)
            .cloned())
    }

    async fn focus_active_editor_group(&self) -> Result<(), AssistantError> {
        *self.focus_requests.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
