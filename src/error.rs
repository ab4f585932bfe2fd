use thiserror::Error;

/// Custom error type for confpilot operations.
///
/// Tool-level failures never surface through this type; they are rendered
/// into [`crate::tools::ToolResult`] text for the model to read.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// A schema document could not be read or has an unusable shape.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Building or querying the full-text index failed.
    #[error("Index error: {0}")]
    Index(String),

    /// The language-model request itself failed (transport, protocol, status).
    #[error("Model error: {message}")]
    Model {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A host collaborator (configuration store, command dispatch) failed.
    #[error("Host error: {0}")]
    Host(String),

    /// Configuration file or environment is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The turn's cancellation token was signalled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl AssistantError {
    /// Model error without an underlying source.
    pub fn model(message: impl Into<String>) -> Self {
        AssistantError::Model {
            message: message.into(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::Schema(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AssistantError {
    fn from(err: std::io::Error) -> Self {
        AssistantError::Host(format!("I/O error: {}", err))
    }
}

impl From<tantivy::TantivyError> for AssistantError {
    fn from(err: tantivy::TantivyError) -> Self {
        AssistantError::Index(err.to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::Model {
            message: format!("HTTP request failed: {}", err),
            source: Some(Box::new(err)),
        }
    }
}
