use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-turn data handed to every tool invocation.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub turn_id: String,
    /// The user's request text for this turn.
    pub request: String,
    pub cancel: CancellationToken,
}

impl TurnContext {
    pub fn new(request: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            turn_id: Uuid::new_v4().to_string(),
            request: request.into(),
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
