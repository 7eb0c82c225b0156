use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use twin_agent::{AgentFactory, FactoryError, TurnOrchestrator};
use twin_core::config::AppConfig;

pub struct Application {
    pub config: AppConfig,
    pub orchestrator: TurnOrchestrator,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("agent construction failed: {0}")]
    Agent(#[from] FactoryError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        knowledge_dir = %config.knowledge.dir.display(),
        "starting application bootstrap"
    );

    let agent = AgentFactory::new(&config).build()?;
    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        model = %agent.model_name(),
        documents = agent.documents().len(),
        "agent ready to serve turns"
    );

    Ok(Application { config, orchestrator: TurnOrchestrator::new(Arc::new(agent)) })
}
