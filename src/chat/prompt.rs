//! Model-facing conversation rendering.

use std::collections::BTreeMap;

use super::message::{ChatMessage, ToolCallRound, TurnRecord};

/// Standing instructions sent as the first message of every request.
pub const SYSTEM_INSTRUCTION: &str = "You are an assistant inside a code editor that changes \
editor settings and runs editor commands for the user.

Follow this procedure:
1. Call search_configurations with a few keywords describing what the user wants. Pass an \
exact key if you already know it.
2. Pick the best matching setting or command from the results. Prefer settings over commands \
when both would satisfy the request.
3. To change settings, call update_settings with a map of keys to new values. Only use values \
that the setting's description or type allows.
4. To run a command, call run_command with its exact key and, when needed, a JSON-encoded \
argumentsArray.
5. If nothing matches, say so. Do not invent keys.

In your final answer, state what you changed including the new value, or which command you \
ran and its keybinding if it has one. Always wrap setting and command keys in backticks.";

/// Appended after every tool round in the current turn.
pub const TOOL_RESULTS_INSTRUCTION: &str = "Above are the results of the tool calls you made. \
The user cannot see these results, so restate anything relevant in your answer.";

/// Text stored for a call whose result is missing from replayed metadata.
const MISSING_RESULT: &str = "No result was recorded for this call.";

/// Replay the most recent `window` turns as model messages.
///
/// Turns with tool metadata replay their rounds exactly (assistant calls
/// followed by tool results); other turns replay the plain response.
pub fn render_history(history: &[TurnRecord], window: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(window);
    let mut messages = Vec::new();
    for turn in &history[start..] {
        messages.push(ChatMessage::user(&turn.request));
        match &turn.metadata {
            Some(metadata) if !metadata.rounds.is_empty() => {
                for round in &metadata.rounds {
                    push_round(&mut messages, round, &metadata.results);
                }
            }
            _ => messages.push(ChatMessage::assistant(&turn.response)),
        }
    }
    messages
}

/// Append one round: the assistant message, then one tool message per call.
pub fn push_round(
    messages: &mut Vec<ChatMessage>,
    round: &ToolCallRound,
    results: &BTreeMap<String, String>,
) {
    if round.tool_calls.is_empty() {
        messages.push(ChatMessage::assistant(&round.response));
        return;
    }
    messages.push(ChatMessage::assistant_with_calls(
        &round.response,
        round.tool_calls.clone(),
    ));
    for call in &round.tool_calls {
        let result = results
            .get(&call.call_id)
            .map(String::as_str)
            .unwrap_or(MISSING_RESULT);
        messages.push(ChatMessage::tool_result(&call.call_id, result));
    }
}

/// Full request for the current state of a turn.
pub fn compose(
    history: &[ChatMessage],
    request: &str,
    rounds: &[ToolCallRound],
    results: &BTreeMap<String, String>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2 + rounds.len() * 3);
    messages.push(ChatMessage::system(SYSTEM_INSTRUCTION));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(request));
    for round in rounds {
        push_round(&mut messages, round, results);
        messages.push(ChatMessage::user(TOOL_RESULTS_INSTRUCTION));
    }
    messages
}
