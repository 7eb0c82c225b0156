//! The contact-request pipeline: validate → summarize → deliver → report.
//!
//! [`ContactDispatcher`] is the only entry point that touches the network and
//! it never returns an error; every failure becomes a user-facing message.

pub mod dispatcher;
pub mod mailer;
pub mod summarizer;
pub mod validator;

use thiserror::Error;
use twin_core::errors::DomainError;
use twin_core::prompts::PromptError;

use crate::llm::LlmError;

pub use dispatcher::{ContactDispatcher, DispatchOutcome};
pub use mailer::{MailError, Mailer, OutgoingEmail, SmtpMailer};
pub use summarizer::ConversationSummarizer;
pub use validator::{validate_address, validate_request, ValidatedContactRequest};

#[derive(Debug, Error)]
pub enum ContactError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("summary prompt failed: {0}")]
    Prompt(#[from] PromptError),
    #[error("conversation summary failed: {0}")]
    Summarizer(#[from] LlmError),
    #[error("mail delivery failed: {0}")]
    Mail(#[from] MailError),
    #[error("contact pipeline panicked")]
    Panicked,
}

impl ContactError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Prompt(_) => "prompt",
            Self::Summarizer(_) => "summarizer",
            Self::Mail(MailError::MissingCredentials) => "missing_credentials",
            Self::Mail(_) => "mail",
            Self::Panicked => "panic",
        }
    }
}
