//! Scripted collaborators for tests in this crate and, through the
//! `test-support` feature, for the server's router tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use twin_core::config::AppConfig;

use crate::agent::Agent;
use crate::contact::mailer::{MailError, Mailer, OutgoingEmail};
use crate::contact::{ContactDispatcher, ConversationSummarizer};
use crate::llm::{ChatRequest, ChunkStream, LlmClient, LlmError, ModelChunk};

pub type Round = Vec<Result<ModelChunk, LlmError>>;

/// Replays one scripted round per `stream_chat` call and records every request.
pub struct ScriptedModel {
    rounds: Mutex<VecDeque<Round>>,
    completion: Result<String, LlmError>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn with_rounds(rounds: Vec<Round>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            completion: Err(LlmError::Provider("no completion scripted".to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_completion(completion: Result<String, LlmError>) -> Self {
        Self { completion, ..Self::with_rounds(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedModel {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        self.completion.clone()
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        self.requests.lock().expect("requests lock").push(request.clone());
        let round = self
            .rounds
            .lock()
            .expect("rounds lock")
            .pop_front()
            .ok_or_else(|| LlmError::Transport("script exhausted".to_string()))?;
        Ok(Box::pin(stream::iter(round)))
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_with: Option<MailError>,
}

impl RecordingMailer {
    pub fn failing(error: MailError) -> Self {
        Self { fail_with: Some(error), ..Self::default() }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        self.sent.lock().expect("mailer lock").push(email.clone());
        Ok(())
    }
}

/// Agent over a scripted model; contact requests are recorded, never mailed.
pub fn scripted_agent(rounds: Vec<Round>) -> Agent {
    let config = AppConfig::default();
    let summary = Arc::new(ScriptedModel::with_completion(Ok("- summary".to_string())));
    let dispatcher = ContactDispatcher::new(
        ConversationSummarizer::new(summary, "Samuel"),
        Arc::new(RecordingMailer::default()),
        &config.contact,
        "Samuel",
    );
    Agent::new(Arc::new(ScriptedModel::with_rounds(rounds)), "system".to_string(), dispatcher, 2)
}
