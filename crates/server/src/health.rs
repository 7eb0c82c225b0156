use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use twin_agent::TurnOrchestrator;

#[derive(Clone)]
pub struct HealthState {
    orchestrator: TurnOrchestrator,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: HealthCheck,
    pub knowledge: HealthCheck,
    pub checked_at: String,
}

pub fn router(orchestrator: TurnOrchestrator) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { orchestrator })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let agent = state.orchestrator.agent();
    let documents: Vec<&str> = agent.documents().iter().map(|kind| kind.as_str()).collect();
    let ready = !documents.is_empty();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        model: HealthCheck { status: "ready", detail: agent.model_name().to_string() },
        knowledge: HealthCheck {
            status: if ready { "ready" } else { "degraded" },
            detail: format!(
                "{} document(s) [{}], {} prompt characters",
                documents.len(),
                documents.join(", "),
                agent.system_prompt().len()
            ),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
