//! Conversation model and the tool-calling orchestration loop.

pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod transcript;

pub use message::{
    ChatMessage, ResponsePart, Role, ToolCall, ToolCallRound, TurnMetadata, TurnRecord,
};
pub use orchestrator::{
    ChatRequest, LoopOptions, Orchestrator, StopReason, TurnResult, GENERIC_FAILURE,
};
pub use transcript::TranscriptFile;
