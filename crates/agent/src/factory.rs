use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;
use twin_core::config::{AppConfig, LlmConfig};
use twin_core::knowledge::{KnowledgeContext, KnowledgeError};
use twin_core::prompts::{render_system_prompt, PromptError};

use crate::agent::Agent;
use crate::contact::{ContactDispatcher, ConversationSummarizer, Mailer, SmtpMailer};
use crate::gemini::GeminiClient;
use crate::llm::{LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("model credential is not configured (set TWIN_LLM_API_KEY or GOOGLE_API_KEY)")]
    MissingCredential,
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("model client could not be constructed: {0}")]
    Client(#[from] LlmError),
}

/// Builds the process-wide [`Agent`] once at startup.
///
/// Any error here is fatal: the process has nothing to serve without a model
/// credential and at least one knowledge document.
pub struct AgentFactory<'a> {
    config: &'a AppConfig,
}

impl<'a> AgentFactory<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Wires the Gemini client and SMTP mailer from configuration.
    pub fn build(&self) -> Result<Agent, FactoryError> {
        let api_key = require_credential(&self.config.llm)?;
        let llm = &self.config.llm;

        let chat_model = GeminiClient::new(
            api_key.clone(),
            llm.base_url.clone(),
            llm.model.clone(),
            llm.temperature,
            llm.timeout_secs,
        )?;
        let summary_model = GeminiClient::new(
            api_key,
            llm.base_url.clone(),
            llm.summary_model.clone(),
            llm.temperature,
            llm.timeout_secs,
        )?;
        let mailer = SmtpMailer::from_config(&self.config.contact);

        self.build_with(Arc::new(chat_model), Arc::new(summary_model), Arc::new(mailer))
    }

    /// Same as [`AgentFactory::build`] with caller-supplied collaborators.
    pub fn build_with(
        &self,
        chat_model: Arc<dyn LlmClient>,
        summary_model: Arc<dyn LlmClient>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Agent, FactoryError> {
        require_credential(&self.config.llm)?;

        let subject_name = self.config.knowledge.subject_name.as_str();
        let knowledge = KnowledgeContext::load(&self.config.knowledge)?;
        let system_prompt = render_system_prompt(subject_name, knowledge.as_str())?;

        let summarizer = ConversationSummarizer::new(summary_model, subject_name);
        let dispatcher =
            ContactDispatcher::new(summarizer, mailer, &self.config.contact, subject_name);

        info!(
            event_name = "system.bootstrap.agent_ready",
            correlation_id = "bootstrap",
            model = %chat_model.model_name(),
            knowledge_characters = knowledge.len(),
            prompt_characters = system_prompt.len(),
            "agent built"
        );

        Ok(Agent::new(chat_model, system_prompt, dispatcher, self.config.llm.max_tool_rounds)
            .with_documents(knowledge.documents()))
    }
}

fn require_credential(llm: &LlmConfig) -> Result<SecretString, FactoryError> {
    match &llm.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => Ok(key.clone()),
        _ => Err(FactoryError::MissingCredential),
    }
}
