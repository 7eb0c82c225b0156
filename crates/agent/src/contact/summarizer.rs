use std::sync::Arc;

use twin_core::prompts::render_summary_prompt;

use crate::contact::ContactError;
use crate::llm::LlmClient;

/// Single-shot, stateless transcript digest (3-5 bullet points).
#[derive(Clone)]
pub struct ConversationSummarizer {
    client: Arc<dyn LlmClient>,
    subject_name: String,
}

impl ConversationSummarizer {
    pub fn new(client: Arc<dyn LlmClient>, subject_name: impl Into<String>) -> Self {
        Self { client, subject_name: subject_name.into() }
    }

    pub async fn summarize(&self, transcript: &str) -> Result<String, ContactError> {
        let prompt = render_summary_prompt(&self.subject_name, transcript)?;
        let summary = self.client.complete(&prompt).await?;
        Ok(summary)
    }
}
