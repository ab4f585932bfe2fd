//! Argument checking for commands whose argument shape models often get wrong.
//!
//! One validation round per turn: the model judges the candidate argument,
//! and on an INVALID verdict is asked once for a corrected argument. The
//! corrected argument goes back to the loop as a retryable result. A later
//! call in the same turn skips validation entirely.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::catalog::{ArgsSchema, Command};
use crate::chat::ChatMessage;
use crate::llm::{complete_text, LanguageModel};
use crate::session::TurnContext;

const JUDGE_INSTRUCTION: &str = "You check arguments for editor commands. Given the user's \
request, a command, its argument schema and a candidate argument, decide whether the candidate \
is valid for the schema and does what the user asked. Answer VALID or INVALID on the first line, \
then one short sentence explaining why.";

const CORRECT_INSTRUCTION: &str = "You fix arguments for editor commands. Given the user's \
request, a command, its argument schema and an invalid candidate argument, reply with only the \
corrected argument as a single JSON value. Do not add any explanation.";

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid,
    /// The argument was judged invalid; `argument` is the model's correction.
    Corrected {
        argument: String,
        reason: String,
    },
    Cancelled,
}

/// Runs the nested validation round-trips for one session.
pub struct ArgumentValidator {
    model: Arc<dyn LanguageModel>,
    /// Turn id whose request has already been through validation.
    validated_turn: Mutex<Option<String>>,
}

impl ArgumentValidator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            validated_turn: Mutex::new(None),
        }
    }

    pub async fn validate(&self, ctx: &TurnContext, command: &Command, candidate: &Value) -> Verdict {
        {
            let mut validated = self.validated_turn.lock().await;
            if validated.as_deref() == Some(ctx.turn_id.as_str()) {
                debug!(command = %command.key, "arguments already validated this turn");
                return Verdict::Valid;
            }
            *validated = Some(ctx.turn_id.clone());
        }
        if ctx.is_cancelled() {
            return Verdict::Cancelled;
        }

        let facts = describe(ctx, command, candidate);
        let judgement = match complete_text(
            self.model.as_ref(),
            vec![
                ChatMessage::system(JUDGE_INSTRUCTION),
                ChatMessage::user(facts.clone()),
            ],
            ctx.cancel.clone(),
        )
        .await
        {
            Ok(text) => text,
            Err(crate::AssistantError::Cancelled) => return Verdict::Cancelled,
            Err(e) => {
                warn!(command = %command.key, error = %e, "argument validation unavailable, accepting candidate");
                return Verdict::Valid;
            }
        };

        let (valid, reason) = parse_judgement(&judgement);
        if valid {
            return Verdict::Valid;
        }
        debug!(command = %command.key, %reason, "candidate arguments judged invalid");

        if ctx.is_cancelled() {
            return Verdict::Cancelled;
        }
        match complete_text(
            self.model.as_ref(),
            vec![
                ChatMessage::system(CORRECT_INSTRUCTION),
                ChatMessage::user(facts),
            ],
            ctx.cancel.clone(),
        )
        .await
        {
            Ok(text) => Verdict::Corrected {
                argument: strip_code_fence(&text).to_string(),
                reason,
            },
            Err(crate::AssistantError::Cancelled) => Verdict::Cancelled,
            Err(e) => {
                warn!(command = %command.key, error = %e, "argument correction failed");
                Verdict::Corrected {
                    argument: String::new(),
                    reason,
                }
            }
        }
    }
}

fn describe(ctx: &TurnContext, command: &Command, candidate: &Value) -> String {
    let schema = match &command.args_schema {
        Some(ArgsSchema::Schema(schema)) => schema.to_string(),
        Some(ArgsSchema::Hint(hint)) => hint.clone(),
        None => "(none)".into(),
    };
    format!(
        "User request: {}\nCommand: {} ({})\nArgument schema: {}\nCandidate argument: {}",
        ctx.request, command.key, command.description, schema, candidate
    )
}

/// `(is_valid, reason)` from a VALID/INVALID answer. Anything that does not
/// start with INVALID counts as valid.
fn parse_judgement(text: &str) -> (bool, String) {
    let text = text.trim();
    let first_word: String = text
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let reason = text[first_word.len()..]
        .trim_start_matches([':', '.', '-', ' ', '\n'])
        .trim()
        .to_string();
    (!first_word.eq_ignore_ascii_case("invalid"), reason)
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop a language tag on the opening fence.
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.contains(['{', '[']) => body.trim(),
        _ => inner.trim(),
    }
}
