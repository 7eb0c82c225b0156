use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{info, warn};
use twin_core::domain::turn::Turn;
use twin_core::errors::DomainError;
use uuid::Uuid;

use crate::agent::{Agent, StreamEvent};
use crate::conversation::MessageNormalizer;

pub const EMPTY_RESPONSE_APOLOGY: &str =
    "I apologize, but I wasn't able to generate a response. Please try again.";

/// Drives one chat turn against the shared [`Agent`].
#[derive(Clone)]
pub struct TurnOrchestrator {
    agent: Arc<Agent>,
    normalizer: MessageNormalizer,
}

impl TurnOrchestrator {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent, normalizer: MessageNormalizer::new() }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Normalized history with the new user message appended last.
    pub fn prepare_turns(&self, message: &str, history: &[Value]) -> Result<Vec<Turn>, DomainError> {
        let mut turns = self.normalizer.normalize(history);
        turns.push(Turn::user(message)?);
        Ok(turns)
    }

    /// Yields the growing response text for one turn.
    ///
    /// Every yielded string extends the previous one. The stream always yields
    /// at least once; a turn with no model text yields [`EMPTY_RESPONSE_APOLOGY`].
    pub fn run_turn(
        &self,
        message: &str,
        history: &[Value],
    ) -> Result<impl Stream<Item = String> + Send + 'static, DomainError> {
        let turns = self.prepare_turns(message, history)?;
        let agent = Arc::clone(&self.agent);
        let correlation_id = Uuid::new_v4().to_string();

        info!(
            event_name = "agent.turn.start",
            correlation_id = %correlation_id,
            turns = turns.len(),
            "starting chat turn"
        );

        Ok(async_stream::stream! {
            let events = agent.stream_events(turns, &correlation_id);
            let responses = accumulate_responses(events, &correlation_id);
            futures::pin_mut!(responses);
            while let Some(response) = responses.next().await {
                yield response;
            }
        })
    }
}

/// Folds agent events into accumulated response strings.
///
/// Partial tokens are authoritative: a round's final output is only used while
/// nothing has been accumulated for the turn, so at most one round contributes
/// that way.
pub fn accumulate_responses<'a, S>(
    events: S,
    correlation_id: &'a str,
) -> impl Stream<Item = String> + Send + 'a
where
    S: Stream<Item = StreamEvent> + Send + 'a,
{
    async_stream::stream! {
        futures::pin_mut!(events);
        let mut accumulated = String::new();

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::PartialToken(fragment) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    accumulated.push_str(&fragment);
                    yield accumulated.clone();
                }
                StreamEvent::TurnComplete { output } => {
                    if accumulated.is_empty() && !output.trim().is_empty() {
                        accumulated.push_str(&output);
                        yield accumulated.clone();
                    }
                }
                StreamEvent::Other(_) => {}
            }
        }

        if accumulated.is_empty() {
            warn!(
                event_name = "agent.turn.fallback",
                correlation_id,
                "turn produced no text; sending apology"
            );
            yield EMPTY_RESPONSE_APOLOGY.to_string();
        } else {
            info!(
                event_name = "agent.turn.complete",
                correlation_id,
                characters = accumulated.len(),
                "chat turn complete"
            );
        }
    }
}
