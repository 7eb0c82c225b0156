use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};
use twin_core::domain::turn::Turn;
use twin_core::knowledge::DocumentKind;

use crate::contact::ContactDispatcher;
use crate::llm::{ChatMessage, ChatRequest, LlmClient, ModelChunk, ToolCall, ToolSpec};
use crate::tools::{contact_tool_spec, ToolCommand};

/// What a model invocation reports while it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental text fragment.
    PartialToken(String),
    /// End of one model round, carrying that round's full text.
    TurnComplete { output: String },
    Other(AgentSignal),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentSignal {
    ToolStarted { name: String },
    ToolFinished { name: String, succeeded: bool },
    ModelError(String),
    RoundLimitReached,
}

/// The startup-built handle: model, rendered system prompt and the one bound tool.
///
/// Immutable after construction and shared by every turn.
pub struct Agent {
    model: Arc<dyn LlmClient>,
    system_prompt: String,
    tools: Vec<ToolSpec>,
    dispatcher: ContactDispatcher,
    max_tool_rounds: u32,
    documents: Vec<DocumentKind>,
}

impl Agent {
    pub fn new(
        model: Arc<dyn LlmClient>,
        system_prompt: String,
        dispatcher: ContactDispatcher,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            model,
            system_prompt,
            tools: vec![contact_tool_spec()],
            dispatcher,
            max_tool_rounds: max_tool_rounds.max(1),
            documents: Vec::new(),
        }
    }

    pub fn with_documents(mut self, documents: &[DocumentKind]) -> Self {
        self.documents = documents.to_vec();
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn documents(&self) -> &[DocumentKind] {
        &self.documents
    }

    /// Runs the tool loop over `turns`, reporting progress as [`StreamEvent`]s.
    ///
    /// Each round streams model text, then executes any tool calls and feeds
    /// their outcomes back for the next round. Model failures end the stream
    /// with an [`AgentSignal::ModelError`]; nothing is returned as an error.
    pub fn stream_events<'a>(
        &'a self,
        turns: Vec<Turn>,
        correlation_id: &'a str,
    ) -> impl Stream<Item = StreamEvent> + Send + 'a {
        let mut messages: Vec<ChatMessage> = turns.iter().map(ChatMessage::from).collect();

        async_stream::stream! {
            for round in 1..=self.max_tool_rounds {
                let request = ChatRequest {
                    system_prompt: self.system_prompt.clone(),
                    messages: messages.clone(),
                    tools: self.tools.clone(),
                };

                let mut chunks = match self.model.stream_chat(&request).await {
                    Ok(chunks) => chunks,
                    Err(error) => {
                        warn!(
                            event_name = "agent.model.failed",
                            correlation_id,
                            round,
                            error = %error,
                            "model invocation failed"
                        );
                        yield StreamEvent::Other(AgentSignal::ModelError(error.to_string()));
                        return;
                    }
                };

                let mut output = String::new();
                let mut calls: Vec<ToolCall> = Vec::new();
                let mut failed = false;

                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(ModelChunk::Text(text)) => {
                            output.push_str(&text);
                            yield StreamEvent::PartialToken(text);
                        }
                        Ok(ModelChunk::Complete(text)) => output.push_str(&text),
                        Ok(ModelChunk::ToolCall(call)) => calls.push(call),
                        Err(error) => {
                            warn!(
                                event_name = "agent.model.stream_failed",
                                correlation_id,
                                round,
                                error = %error,
                                "model stream ended with an error"
                            );
                            yield StreamEvent::Other(AgentSignal::ModelError(error.to_string()));
                            failed = true;
                            break;
                        }
                    }
                }

                debug!(
                    event_name = "agent.round.complete",
                    correlation_id,
                    round,
                    characters = output.len(),
                    tool_calls = calls.len(),
                    "model round complete"
                );
                yield StreamEvent::TurnComplete { output: output.clone() };

                if failed || calls.is_empty() {
                    return;
                }

                messages.push(ChatMessage::Model { text: output, tool_calls: calls.clone() });
                for call in calls {
                    yield StreamEvent::Other(AgentSignal::ToolStarted { name: call.name.clone() });
                    let (result, succeeded) = self.run_tool(&call, correlation_id).await;
                    yield StreamEvent::Other(AgentSignal::ToolFinished {
                        name: call.name.clone(),
                        succeeded,
                    });
                    messages.push(ChatMessage::ToolResult { name: call.name, output: result });
                }
            }

            warn!(
                event_name = "agent.round.limit",
                correlation_id,
                max_tool_rounds = self.max_tool_rounds,
                "tool loop stopped at the round limit"
            );
            yield StreamEvent::Other(AgentSignal::RoundLimitReached);
        }
    }

    async fn run_tool(&self, call: &ToolCall, correlation_id: &str) -> (String, bool) {
        match ToolCommand::parse(&call.name, &call.arguments) {
            Ok(ToolCommand::ContactRequest(request)) => {
                info!(
                    event_name = "agent.tool.invoked",
                    correlation_id,
                    tool = %call.name,
                    "dispatching contact request"
                );
                let outcome = self.dispatcher.dispatch(&request, correlation_id).await;
                let delivered = outcome.is_delivered();
                (outcome.into_message(), delivered)
            }
            Err(error) => {
                warn!(
                    event_name = "agent.tool.rejected",
                    correlation_id,
                    tool = %call.name,
                    error = %error,
                    "tool call rejected"
                );
                (error.tool_output(), false)
            }
        }
    }
}
