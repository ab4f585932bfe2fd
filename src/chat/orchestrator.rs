//! The multi-round tool-calling loop for one chat turn.

use futures::future::join_all;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::Catalog;
use crate::host::ResponseSink;
use crate::index::ConfigurationIndex;
use crate::llm::{LanguageModel, ModelRequest, ResponseStream};
use crate::render::Linkifier;
use crate::session::{MutationLedger, TurnContext, UndoAction};
use crate::tools::{Tool, ToolDefinition, ToolRegistry, SETTINGS_TAG};
use crate::AssistantError;

use super::message::{ChatMessage, ResponsePart, ToolCall, ToolCallRound, TurnMetadata, TurnRecord};
use super::prompt::{compose, render_history};

/// Shown to the user when the model call itself fails.
pub const GENERIC_FAILURE: &str = "Sorry, something went wrong while contacting the language model. Please try again.";

/// Loop tuning.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Number of previous turns replayed to the model.
    pub history_turns: usize,
    /// Hard cap on model rounds per turn. `None` means no cap.
    pub max_rounds: Option<usize>,
    /// Only tools carrying this tag are offered.
    pub tool_tag: &'static str,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            history_turns: 5,
            max_rounds: Some(25),
            tool_tag: SETTINGS_TAG,
        }
    }
}

/// One user request plus the transcript that preceded it.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub prompt: String,
    pub history: Vec<TurnRecord>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<TurnRecord>) -> Self {
        self.history = history;
        self
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A round produced no tool calls.
    Converged,
    RoundLimit,
    Cancelled,
}

/// Outcome of a finished turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Response text without link markup.
    pub text: String,
    pub metadata: TurnMetadata,
    pub undo: Option<UndoAction>,
    pub stop: StopReason,
}

impl TurnResult {
    pub fn rounds(&self) -> usize {
        self.metadata.rounds.len()
    }

    /// History entry for a later turn.
    pub fn record(&self, request: impl Into<String>) -> TurnRecord {
        TurnRecord {
            request: request.into(),
            response: self.text.clone(),
            metadata: Some(self.metadata.clone()),
        }
    }
}

enum Phase {
    Composing,
    AwaitingModel(Vec<ChatMessage>),
    Streaming(ResponseStream),
    Dispatching { text: String, calls: Vec<ToolCall> },
    Done(StopReason),
}

/// Drives the model through think, call, observe rounds until it stops
/// asking for tools.
pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    index: Arc<ConfigurationIndex>,
    ledger: MutationLedger,
    options: LoopOptions,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: Arc<ToolRegistry>,
        index: Arc<ConfigurationIndex>,
        ledger: MutationLedger,
        options: LoopOptions,
    ) -> Self {
        Self {
            model,
            registry,
            index,
            ledger,
            options,
        }
    }

    pub fn ledger(&self) -> &MutationLedger {
        &self.ledger
    }

    pub fn manifest(&self) -> Vec<ToolDefinition> {
        self.registry.manifest(self.options.tool_tag)
    }

    /// Run one turn. Only a failed model call is an `Err`; tool failures are
    /// fed back to the model as results.
    #[instrument(name = "chat.turn", skip_all)]
    pub async fn run_turn(
        &self,
        request: ChatRequest,
        sink: &dyn ResponseSink,
        cancel: CancellationToken,
    ) -> Result<TurnResult, AssistantError> {
        let start = Instant::now();
        self.ledger.begin_turn().await;

        let catalog = match self.index.catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "catalog unavailable, responses will not be linked");
                Arc::new(Catalog::default())
            }
        };
        let ctx = TurnContext::new(request.prompt.clone(), cancel);
        let tools = self.manifest();
        let history = render_history(&request.history, self.options.history_turns);

        let mut rounds: Vec<ToolCallRound> = Vec::new();
        let mut results: BTreeMap<String, String> = BTreeMap::new();
        let mut text = String::new();
        let mut phase = Phase::Composing;

        let stop = loop {
            phase = match phase {
                Phase::Composing => {
                    if ctx.is_cancelled() {
                        Phase::Done(StopReason::Cancelled)
                    } else if self.options.max_rounds.is_some_and(|max| rounds.len() >= max) {
                        warn!(rounds = rounds.len(), "round limit reached, ending turn");
                        Phase::Done(StopReason::RoundLimit)
                    } else {
                        Phase::AwaitingModel(compose(&history, &request.prompt, &rounds, &results))
                    }
                }
                Phase::AwaitingModel(messages) => {
                    debug!(round = rounds.len() + 1, messages = messages.len(), "sending model request");
                    let request = ModelRequest {
                        messages,
                        tools: tools.clone(),
                    };
                    match self.model.send(request, ctx.cancel.clone()).await {
                        Ok(stream) => Phase::Streaming(stream),
                        Err(AssistantError::Cancelled) => Phase::Done(StopReason::Cancelled),
                        Err(e) => return Err(self.fail(sink, e)),
                    }
                }
                Phase::Streaming(mut stream) => {
                    let mut linkifier = Linkifier::new(catalog.as_ref());
                    let mut round_text = String::new();
                    let mut calls = Vec::new();
                    let mut cancelled = false;
                    while let Some(part) = stream.next().await {
                        match part {
                            Ok(ResponsePart::Text(fragment)) => {
                                let out = linkifier.push(&fragment);
                                if !out.markdown.is_empty() {
                                    sink.markdown(&out.markdown);
                                }
                                round_text.push_str(&out.plain);
                            }
                            Ok(ResponsePart::ToolCall(call)) => {
                                if self.registry.resolve(&call.name, self.options.tool_tag).is_some() {
                                    calls.push(call);
                                } else {
                                    warn!(tool = %call.name, "dropping call to unknown tool");
                                }
                            }
                            Err(AssistantError::Cancelled) => {
                                cancelled = true;
                                break;
                            }
                            Err(e) => return Err(self.fail(sink, e)),
                        }
                    }
                    let out = linkifier.finish();
                    if !out.markdown.is_empty() {
                        sink.markdown(&out.markdown);
                    }
                    round_text.push_str(&out.plain);
                    text.push_str(&round_text);

                    if cancelled {
                        // Calls from a cut-off stream are never dispatched.
                        rounds.push(ToolCallRound {
                            response: round_text,
                            tool_calls: Vec::new(),
                        });
                        Phase::Done(StopReason::Cancelled)
                    } else {
                        Phase::Dispatching {
                            text: round_text,
                            calls,
                        }
                    }
                }
                Phase::Dispatching { text: round_text, calls } => {
                    if calls.is_empty() {
                        rounds.push(ToolCallRound {
                            response: round_text,
                            tool_calls: Vec::new(),
                        });
                        Phase::Done(StopReason::Converged)
                    } else {
                        debug!(calls = calls.len(), "dispatching tool calls");
                        let outputs = join_all(calls.iter().map(|call| self.invoke(call, &ctx))).await;
                        for (call, output) in calls.iter().zip(outputs) {
                            results.insert(call.call_id.clone(), output);
                        }
                        rounds.push(ToolCallRound {
                            response: round_text,
                            tool_calls: calls,
                        });
                        Phase::Composing
                    }
                }
                Phase::Done(reason) => break reason,
            };
        };

        let undo = self.ledger.undo_action().await;
        if let Some(action) = &undo {
            sink.undo_button(action);
        }
        info!(
            rounds = rounds.len(),
            stop = ?stop,
            undo = undo.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "turn finished"
        );

        Ok(TurnResult {
            text,
            metadata: TurnMetadata { rounds, results },
            undo,
            stop,
        })
    }

    async fn invoke(&self, call: &ToolCall, ctx: &TurnContext) -> String {
        // Calls were filtered against the registry while streaming.
        let Some(tool) = self.registry.resolve(&call.name, self.options.tool_tag) else {
            return String::new();
        };
        let result = tool.invoke(call.arguments.clone(), ctx).await;
        debug!(tool = tool.name(), call_id = %call.call_id, status = ?result.status, "tool finished");
        result.content
    }

    fn fail(&self, sink: &dyn ResponseSink, e: AssistantError) -> AssistantError {
        error!(error = %e, "model request failed");
        sink.markdown(GENERIC_FAILURE);
        e
    }
}
