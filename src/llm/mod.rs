//! Language-model interface and the OpenAI-compatible backend.

pub mod openai;
pub mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatMessage, ResponsePart};
use crate::tools::ToolDefinition;
use crate::AssistantError;

pub use openai::OpenAiCompatibleModel;

/// Incremental model response.
pub type ResponseStream = BoxStream<'static, Result<ResponsePart, AssistantError>>;

/// One request to the model: the conversation so far plus the tool manifest.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// A chat model that can stream text and tool-call requests.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn send(
        &self,
        request: ModelRequest,
        cancel: CancellationToken,
    ) -> Result<ResponseStream, AssistantError>;
}

/// Send a tool-less request and concatenate the streamed text.
pub async fn complete_text(
    model: &dyn LanguageModel,
    messages: Vec<ChatMessage>,
    cancel: CancellationToken,
) -> Result<String, AssistantError> {
    let mut stream = model
        .send(
            ModelRequest {
                messages,
                tools: Vec::new(),
            },
            cancel,
        )
        .await?;
    let mut text = String::new();
    while let Some(part) = stream.next().await {
        if let ResponsePart::Text(fragment) = part? {
            text.push_str(&fragment);
        }
    }
    Ok(text)
}
