//! Server-sent-event decoding for streamed chat completions.

use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::chat::{ResponsePart, ToolCall};
use crate::AssistantError;

/// Splits a byte stream into `data:` payloads.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte
/// character, so bytes are buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Folds chat-completion deltas into response parts.
///
/// Text is emitted as it arrives. Tool calls arrive as fragments keyed by
/// index and are only complete once the stream ends.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    calls: BTreeMap<u64, PartialCall>,
    done: bool,
}

impl DeltaAccumulator {
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn apply(&mut self, data: &str) -> Result<Vec<ResponsePart>, AssistantError> {
        if data == "[DONE]" {
            self.done = true;
            return Ok(Vec::new());
        }
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let event: Value = serde_json::from_str(data).map_err(|e| {
            AssistantError::model(format!("Malformed stream event: {}", e))
        })?;
        if let Some(error) = event.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(AssistantError::model(format!("Model error: {}", message)));
        }

        let mut parts = Vec::new();
        let choices = event
            .get("choices")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for choice in choices {
            let Some(delta) = choice.get("delta") else {
                continue;
            };
            if let Some(text) = delta.get("content").and_then(Value::as_str) {
                if !text.is_empty() {
                    parts.push(ResponsePart::Text(text.to_string()));
                }
            }
            for call in delta
                .get("tool_calls")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
            {
                let index = call.get("index").and_then(Value::as_u64).unwrap_or(0);
                let partial = self.calls.entry(index).or_default();
                if let Some(id) = call.get("id").and_then(Value::as_str) {
                    partial.id = Some(id.to_string());
                }
                if let Some(function) = call.get("function") {
                    if let Some(name) = function.get("name").and_then(Value::as_str) {
                        partial.name.push_str(name);
                    }
                    if let Some(args) = function.get("arguments").and_then(Value::as_str) {
                        partial.arguments.push_str(args);
                    }
                }
            }
        }
        Ok(parts)
    }

    /// Completed tool calls in index order.
    pub fn finish(&mut self) -> Vec<ResponsePart> {
        std::mem::take(&mut self.calls)
            .into_values()
            .filter(|partial| !partial.name.is_empty())
            .map(|partial| {
                let arguments = if partial.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&partial.arguments)
                        .unwrap_or(Value::String(partial.arguments))
                };
                ResponsePart::ToolCall(ToolCall {
                    call_id: partial
                        .id
                        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple())),
                    name: partial.name,
                    arguments,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert_eq!(decoder.push(b":1}\n\n"), vec!["{\"a\":1}".to_string()]);
        assert_eq!(
            decoder.push(b": keep-alive\ndata: [DONE]\r\n"),
            vec!["[DONE]".to_string()]
        );
    }

    #[test]
    fn test_decoder_handles_split_utf8() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: é\n".as_bytes();
        assert!(decoder.push(&bytes[..7]).is_empty());
        assert_eq!(decoder.push(&bytes[7..]), vec!["é".to_string()]);
    }

    #[test]
    fn test_accumulator_assembles_tool_calls() {
        let mut acc = DeltaAccumulator::default();
        let first = json!({"choices": [{"delta": {"content": "Looking", "tool_calls": [
            {"index": 0, "id": "call_a", "function": {"name": "search_configurations", "arguments": "{\"keyw"}}
        ]}}]});
        let second = json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "ords\": \"theme\"}"}}
        ]}}]});

        let parts = acc.apply(&first.to_string()).unwrap();
        assert_eq!(parts, vec![ResponsePart::Text("Looking".into())]);
        assert!(acc.apply(&second.to_string()).unwrap().is_empty());
        acc.apply("[DONE]").unwrap();
        assert!(acc.is_done());

        assert_eq!(
            acc.finish(),
            vec![ResponsePart::ToolCall(ToolCall {
                call_id: "call_a".into(),
                name: "search_configurations".into(),
                arguments: json!({"keywords": "theme"}),
            })]
        );
    }

    #[test]
    fn test_accumulator_reports_error_events() {
        let mut acc = DeltaAccumulator::default();
        let err = acc
            .apply(&json!({"error": {"message": "rate limited"}}).to_string())
            .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_empty_arguments_become_empty_object() {
        let mut acc = DeltaAccumulator::default();
        acc.apply(
            &json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "c", "function": {"name": "run_command"}}
            ]}}]})
            .to_string(),
        )
        .unwrap();
        match &acc.finish()[0] {
            ResponsePart::ToolCall(call) => assert_eq!(call.arguments, json!({})),
            other => panic!("unexpected part {:?}", other),
        }
    }
}
