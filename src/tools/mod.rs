//! Tools the model can call, and the registry that exposes them.

pub mod policy;
pub mod run;
pub mod search;
pub mod update;
pub mod validation;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::host::{CommandExecutor, ConfigurationStore, ConfirmationGate};
use crate::index::ConfigurationIndex;
use crate::llm::LanguageModel;
use crate::session::{MutationLedger, TurnContext};

pub use policy::ToolPolicy;
pub use run::{RunCommandInput, RunCommandTool};
pub use search::{SearchConfigurationsInput, SearchConfigurationsTool};
pub use update::{UpdateSettingsInput, UpdateSettingsTool};
pub use validation::{ArgumentValidator, Verdict};

/// Tag carried by every tool in this crate's manifest.
pub const SETTINGS_TAG: &str = "settings";

/// Tool manifest entry advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// How a tool invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    NoOp,
    /// The model should call again with the corrected input in the content.
    Retry,
    InvalidArguments,
    NotFound,
    PersistenceFailure,
    Declined,
    Cancelled,
}

/// The text the model reads back for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub content: String,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            content: content.into(),
        }
    }

    pub fn with_status(status: ToolStatus, content: impl Into<String>) -> Self {
        Self {
            status,
            content: content.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

/// Failures a tool reports back to the model instead of propagating.
#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{kind} '{key}' not found")]
    NotFound {
        kind: &'static str,
        key: String,
        suggestions: Vec<String>,
    },

    #[error("{0}")]
    NoOp(String),

    #[error("Failed to persist change: {0}")]
    PersistenceFailure(String),

    #[error("The user declined: {0}")]
    Declined(String),

    #[error("The request was cancelled")]
    Cancelled,
}

/// Serialized form of a [`ToolFailure`]: error_code + suggestion so the
/// model can correct itself.
#[derive(Debug, Serialize)]
struct FailureBody<'a> {
    error_code: &'static str,
    message: String,
    suggestion: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    did_you_mean: Option<&'a [String]>,
}

impl ToolFailure {
    pub fn status(&self) -> ToolStatus {
        match self {
            ToolFailure::InvalidArguments(_) => ToolStatus::InvalidArguments,
            ToolFailure::NotFound { .. } => ToolStatus::NotFound,
            ToolFailure::NoOp(_) => ToolStatus::NoOp,
            ToolFailure::PersistenceFailure(_) => ToolStatus::PersistenceFailure,
            ToolFailure::Declined(_) => ToolStatus::Declined,
            ToolFailure::Cancelled => ToolStatus::Cancelled,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ToolFailure::InvalidArguments(_) => "INVALID_ARGUMENTS",
            ToolFailure::NotFound { .. } => "NOT_FOUND",
            ToolFailure::NoOp(_) => "NO_OP",
            ToolFailure::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            ToolFailure::Declined(_) => "DECLINED",
            ToolFailure::Cancelled => "CANCELLED",
        }
    }

    fn suggestion(&self) -> &'static str {
        match self {
            ToolFailure::InvalidArguments(_) => "Check the parameter names and types against the tool schema.",
            ToolFailure::NotFound { .. } => {
                "Use search_configurations to find the exact key before retrying."
            }
            ToolFailure::NoOp(_) => "Nothing needs to change. Tell the user.",
            ToolFailure::PersistenceFailure(_) => {
                "Tell the user the change could not be applied and why."
            }
            ToolFailure::Declined(_) => "Do not retry. Tell the user nothing was changed.",
            ToolFailure::Cancelled => "Stop and do not retry.",
        }
    }
}

impl From<ToolFailure> for ToolResult {
    fn from(failure: ToolFailure) -> Self {
        let suggestions = match &failure {
            ToolFailure::NotFound { suggestions, .. } if !suggestions.is_empty() => {
                Some(suggestions.as_slice())
            }
            _ => None,
        };
        let body = FailureBody {
            error_code: failure.error_code(),
            message: failure.to_string(),
            suggestion: failure.suggestion(),
            did_you_mean: suggestions,
        };
        let content = serde_json::to_string(&body).unwrap_or_else(|_| failure.to_string());
        ToolResult {
            status: failure.status(),
            content,
        }
    }
}

/// Deserialize tool input, reporting shape errors as [`ToolFailure::InvalidArguments`].
pub fn parse_input<T: DeserializeOwned>(args: Value) -> Result<T, ToolFailure> {
    serde_json::from_value(args).map_err(|e| ToolFailure::InvalidArguments(e.to_string()))
}

/// JSON schema for a tool input type.
pub fn input_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

/// A callable capability advertised to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn input_schema(&self) -> Value;

    fn tags(&self) -> &'static [&'static str] {
        &[SETTINGS_TAG]
    }

    /// Run the tool. Never fails: every failure is rendered into the result.
    async fn invoke(&self, args: Value, ctx: &TurnContext) -> ToolResult;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Explicit list of tools, filtered by tag when building a manifest.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.tools.iter().any(|t| t.name() == tool.name()) {
            warn!(tool = tool.name(), "replacing already registered tool");
            self.tools.retain(|t| t.name() != tool.name());
        }
        self.tools.push(tool);
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Tool named `name` if it carries `tag`.
    pub fn resolve(&self, name: &str, tag: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.name() == name && t.tags().contains(&tag))
            .cloned()
    }

    /// Manifest of the tools carrying `tag`, in registration order.
    pub fn manifest(&self, tag: &str) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|t| t.tags().contains(&tag))
            .map(|t| t.definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Everything the three settings tools need.
pub struct ToolDependencies {
    pub index: Arc<ConfigurationIndex>,
    pub store: Arc<dyn ConfigurationStore>,
    pub executor: Arc<dyn CommandExecutor>,
    pub gate: Arc<dyn ConfirmationGate>,
    pub ledger: MutationLedger,
    pub model: Arc<dyn LanguageModel>,
    pub policy: Arc<ToolPolicy>,
    pub search_limit: usize,
}

/// Registry holding search, update and run, in that order.
pub fn settings_tools(deps: ToolDependencies) -> ToolRegistry {
    ToolRegistry::new()
        .with(Arc::new(
            SearchConfigurationsTool::new(deps.index.clone(), deps.store.clone())
                .with_limit(deps.search_limit),
        ))
        .with(Arc::new(UpdateSettingsTool::new(
            deps.index.clone(),
            deps.store,
            deps.gate.clone(),
            deps.ledger.clone(),
            deps.policy.clone(),
        )))
        .with(Arc::new(RunCommandTool::new(
            deps.index,
            deps.executor,
            deps.gate,
            deps.ledger,
            deps.policy,
            ArgumentValidator::new(deps.model),
        )))
}
