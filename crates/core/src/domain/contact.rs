use serde::{Deserialize, Serialize};

/// A visitor's request to be put in touch, as issued by the model's tool call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRequest {
    #[serde(rename = "recruiter_email")]
    pub recruiter_address: String,
    pub message: String,
    #[serde(rename = "conversation_history")]
    pub transcript: String,
}

/// The plain-text body sent to the represented person.
///
/// Sections are always in the same order: the recruiter's own message first,
/// then the conversation summary, then the address to reply to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailBody(String);

impl EmailBody {
    pub fn compose(message: &str, summary: &str, recruiter_address: &str) -> Self {
        Self(format!(
            "MESSAGE FROM RECRUITER\n{message}\n\n---\n\nCONVERSATION SUMMARY\n{summary}\n\n---\n\nCONTACT\n{recruiter_address}\n"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

pub fn contact_subject(recruiter_address: &str) -> String {
    format!("Career Twin: Message from recruiter ({recruiter_address})")
}
