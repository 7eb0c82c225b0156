use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use thiserror::Error;
use twin_core::domain::turn::{Role, Turn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("model transport failed: {0}")]
    Transport(String),
    #[error("model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response could not be decoded: {0}")]
    Decode(String),
    #[error("model provider reported an error: {0}")]
    Provider(String),
    #[error("model returned no text")]
    EmptyResponse,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChatMessage {
    User(String),
    Model { text: String, tool_calls: Vec<ToolCall> },
    ToolResult { name: String, output: String },
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        match turn.role() {
            Role::User => Self::User(turn.text().to_string()),
            Role::Assistant => Self::Model { text: turn.text().to_string(), tool_calls: Vec::new() },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
}

/// One item of a streamed model round.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelChunk {
    /// Incremental text fragment.
    Text(String),
    /// The model asks for a tool to be run.
    ToolCall(ToolCall),
    /// Whole round output, sent by providers that do not stream incrementally.
    Complete(String),
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ModelChunk, LlmError>> + Send>>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError>;

    fn model_name(&self) -> &str;
}
