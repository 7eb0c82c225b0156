use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use twin_agent::conversation::message_text;
use twin_agent::TurnOrchestrator;
use twin_core::errors::{ApplicationError, InterfaceError};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    orchestrator: TurnOrchestrator,
    intro: IntroResponse,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatPayload {
    pub message: Value,
    #[serde(default)]
    pub history: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntroResponse {
    pub title: String,
    pub description: String,
    pub examples: Vec<String>,
}

impl IntroResponse {
    pub fn for_subject(subject_name: &str) -> Self {
        Self {
            title: format!("Chat with {subject_name}'s AI Twin"),
            description: format!(
                "Hi! I'm an AI representing {subject_name}. Ask me about their background, \
                 skills, experience, or projects. If you'd like to connect with {subject_name} \
                 directly, just let me know!"
            ),
            examples: vec![
                "Tell me about yourself".to_string(),
                "What are your technical skills?".to_string(),
                "What projects have you worked on?".to_string(),
                "Are you open to new opportunities?".to_string(),
                format!("I'd like to get in touch with {subject_name}"),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatError {
    pub error: String,
    pub correlation_id: String,
}

pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        };
        let body = ChatError {
            error: self.0.user_message().to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(orchestrator: TurnOrchestrator, subject_name: &str) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/intro", get(intro))
        .with_state(ChatState { orchestrator, intro: IntroResponse::for_subject(subject_name) })
}

async fn intro(State(state): State<ChatState>) -> Json<IntroResponse> {
    Json(state.intro)
}

/// Streams the growing answer as `message` events, then a single `done` event.
async fn chat(
    State(state): State<ChatState>,
    Json(payload): Json<ChatPayload>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let message = message_text(&payload.message);
    let responses = state.orchestrator.run_turn(&message, &payload.history).map_err(|error| {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            event_name = "api.chat.rejected",
            correlation_id = %correlation_id,
            error = %error,
            "chat request rejected"
        );
        ApiError(ApplicationError::from(error).into_interface(correlation_id))
    })?;

    let events = responses
        .map(|text| Ok(message_event(&text)))
        .chain(stream::once(async { Ok(Event::default().event("done").data("[DONE]")) }));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// JSON-encodes the text so embedded newlines survive the SSE framing.
fn message_event(text: &str) -> Event {
    Event::default().event("message").json_data(text).unwrap_or_else(|error| {
        warn!(event_name = "api.chat.encode_failed", error = %error, "could not encode response");
        Event::default().event("message").data("")
    })
}
