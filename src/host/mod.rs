//! Interfaces to the host editor.
//!
//! The configuration store, command dispatch, confirmation prompts and the
//! chat response surface all live outside this crate. Each is a trait here,
//! with small implementations for the CLI and for tests.

pub mod confirm;
pub mod file;
pub mod memory;
pub mod sink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::UndoAction;
use crate::AssistantError;

pub use confirm::{AlwaysDecline, AutoApprove, StdinConfirmationGate};
pub use file::JsonFileConfigurationStore;
pub use memory::{DryRunCommandExecutor, InMemoryConfigurationStore};
pub use sink::{BufferedSink, StdoutSink};

/// Key-value view of the host's settings.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Current value of `key`, if the store holds one.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Persist `value` for `key` at global (user) scope.
    async fn update(&self, key: &str, value: Value) -> Result<(), AssistantError>;
}

/// The host's command dispatch entry point.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` with positional `args`. `Ok(None)` when it returns nothing.
    async fn execute(&self, command: &str, args: &[Value]) -> Result<Option<Value>, AssistantError>;

    /// Move focus to the active editor group.
    async fn focus_active_editor_group(&self) -> Result<(), AssistantError>;
}

/// One row of a confirmation prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationItem {
    pub key: String,
    pub value: Value,
    pub description: String,
}

/// Explicit user confirmation requested before a sensitive action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub title: String,
    pub message: String,
    pub items: Vec<ConfirmationItem>,
}

/// Asks the user to approve an action.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

/// The chat surface a turn's response is rendered into.
pub trait ResponseSink: Send + Sync {
    /// Append markdown to the visible response.
    fn markdown(&self, text: &str);

    /// Attach an undo button to the response.
    fn undo_button(&self, action: &UndoAction);
}
