use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::sse::{DeltaAccumulator, SseDecoder};
use super::{LanguageModel, ModelRequest, ResponseStream};
use crate::chat::{ChatMessage, Role};
use crate::config::ModelConfig;
use crate::tools::ToolDefinition;
use crate::AssistantError;

/// Streaming client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatibleModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

impl OpenAiCompatibleModel {
    pub fn new(config: &ModelConfig) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
            temperature: config.temperature,
        })
    }

    fn body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages(&request.messages),
            "stream": true,
        });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(wire_tool).collect());
        }
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

fn wire_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

fn wire_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            let mut wire = json!({ "role": role, "content": message.content });
            if !message.tool_calls.is_empty() {
                wire["tool_calls"] = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.call_id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
            }
            if let Some(id) = &message.tool_call_id {
                wire["tool_call_id"] = json!(id);
            }
            wire
        })
        .collect()
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn send(
        &self,
        request: ModelRequest,
        cancel: CancellationToken,
    ) -> Result<ResponseStream, AssistantError> {
        let mut builder = self.client.post(&self.endpoint).json(&self.body(&request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        debug!(endpoint = %self.endpoint, messages = request.messages.len(), "chat completion request");

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(AssistantError::Cancelled),
            response = builder.send() => response?,
        };
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AssistantError::model(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                detail.trim()
            )));
        }

        let bytes = response.bytes_stream();
        let stream = async_stream::try_stream! {
            futures::pin_mut!(bytes);
            let mut decoder = SseDecoder::default();
            let mut deltas = DeltaAccumulator::default();
            while !deltas.is_done() {
                let next = tokio::select! {
                    _ = cancel.cancelled() => Err(AssistantError::Cancelled),
                    item = bytes.next() => Ok(item),
                }?;
                let Some(chunk) = next else { break };
                let chunk = chunk.map_err(AssistantError::from)?;
                for data in decoder.push(&chunk) {
                    for part in deltas.apply(&data)? {
                        yield part;
                    }
                }
            }
            for part in deltas.finish() {
                yield part;
            }
        };
        Ok(Box::pin(stream))
    }
}
