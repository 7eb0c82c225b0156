use tera::{Context, Tera};
use thiserror::Error;

pub const CONTACT_TOOL_NAME: &str = "send_email_to_owner";

const SYSTEM_PROMPT_TEMPLATE: &str = r#"# Role
You are {{ subject_name }}'s AI representative, answering questions from recruiters on their behalf.

# Instructions
1. Answer questions about {{ subject_name }}'s background, skills, experience, projects, and career goals
2. Use ONLY the information provided in the context below - never make up facts
3. If asked about topics unrelated to {{ subject_name }} (weather, news, other people, general knowledge), politely decline:
   "I'm here to help you learn about {{ subject_name }}. What would you like to know about their background or experience?"
4. When a recruiter wants to contact {{ subject_name }} directly, send a message, or schedule a call, use the {{ tool_name }} tool
5. Be professional, friendly, and conversational - you represent {{ subject_name }}'s personal brand
6. Keep responses concise but informative
7. If you don't have information about something {{ subject_name }}-related, say so honestly

# Context
{{ context }}
"#;

const SUMMARY_PROMPT_TEMPLATE: &str = r#"# Role
You are a conversation summarizer.

# Instructions
1. Summarize this recruiter-agent conversation in 3-5 bullet points
2. Focus on: what the recruiter asked about, key topics discussed, and any specific interests they expressed
3. Keep it concise and actionable for {{ subject_name }} to quickly understand the context

# Input
{{ conversation }}"#;

#[derive(Debug, Error)]
#[error("prompt template `{template}` failed to render: {source}")]
pub struct PromptError {
    template: &'static str,
    #[source]
    source: tera::Error,
}

pub fn render_system_prompt(subject_name: &str, context: &str) -> Result<String, PromptError> {
    let mut values = Context::new();
    values.insert("subject_name", subject_name);
    values.insert("tool_name", CONTACT_TOOL_NAME);
    values.insert("context", context);
    render("system", SYSTEM_PROMPT_TEMPLATE, &values)
}

pub fn render_summary_prompt(subject_name: &str, conversation: &str) -> Result<String, PromptError> {
    let mut values = Context::new();
    values.insert("subject_name", subject_name);
    values.insert("conversation", conversation);
    render("summary", SUMMARY_PROMPT_TEMPLATE, &values)
}

fn render(template: &'static str, source: &str, values: &Context) -> Result<String, PromptError> {
    Tera::one_off(source, values, false).map_err(|source| PromptError { template, source })
}
