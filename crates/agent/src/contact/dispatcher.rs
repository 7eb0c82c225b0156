use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info};
use twin_core::config::{ContactConfig, DEFAULT_RECIPIENT_EMAIL};
use twin_core::domain::contact::{contact_subject, EmailBody};

use crate::contact::mailer::{Mailer, OutgoingEmail};
use crate::contact::summarizer::ConversationSummarizer;
use crate::contact::validator::ValidatedContactRequest;
use crate::contact::ContactError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { message: String },
    Fallback { message: String, reason: &'static str },
}

impl DispatchOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Delivered { message } | Self::Fallback { message, .. } => message,
        }
    }

    pub fn into_message(self) -> String {
        match self {
            Self::Delivered { message } | Self::Fallback { message, .. } => message,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Summarizes the conversation and mails the request to the represented person.
///
/// `dispatch` makes at most one delivery attempt and never fails: any error
/// (or panic) in summarizing or sending is logged and turned into a fallback
/// message that gives the visitor a direct address instead.
#[derive(Clone)]
pub struct ContactDispatcher {
    summarizer: ConversationSummarizer,
    mailer: Arc<dyn Mailer>,
    recipient: String,
    direct_contact: String,
    subject_name: String,
}

impl ContactDispatcher {
    pub fn new(
        summarizer: ConversationSummarizer,
        mailer: Arc<dyn Mailer>,
        config: &ContactConfig,
        subject_name: impl Into<String>,
    ) -> Self {
        Self {
            summarizer,
            mailer,
            recipient: resolve_address(&config.recipient_email),
            direct_contact: resolve_address(&config.direct_contact_email),
            subject_name: subject_name.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub async fn dispatch(
        &self,
        request: &ValidatedContactRequest,
        correlation_id: &str,
    ) -> DispatchOutcome {
        let attempt = AssertUnwindSafe(self.deliver(request)).catch_unwind().await;
        let result = attempt.unwrap_or(Err(ContactError::Panicked));

        match result {
            Ok(()) => {
                info!(
                    event_name = "contact.dispatch.sent",
                    correlation_id,
                    recruiter_address = %request.recruiter_address(),
                    "contact request delivered"
                );
                DispatchOutcome::Delivered { message: self.confirmation() }
            }
            Err(failure) => {
                error!(
                    event_name = "contact.dispatch.failed",
                    correlation_id,
                    error_kind = failure.kind(),
                    error = %failure,
                    "contact request could not be delivered"
                );
                DispatchOutcome::Fallback { message: self.fallback(), reason: failure.kind() }
            }
        }
    }

    async fn deliver(&self, request: &ValidatedContactRequest) -> Result<(), ContactError> {
        let summary = self.summarizer.summarize(request.transcript()).await?;
        let body = EmailBody::compose(request.message(), &summary, request.recruiter_address());
        let email = OutgoingEmail {
            to: self.recipient.clone(),
            subject: contact_subject(request.recruiter_address()),
            body: body.into_string(),
        };
        self.mailer.send(&email).await?;
        Ok(())
    }

    fn confirmation(&self) -> String {
        format!(
            "Your message has been sent to {name}. {name} typically responds within 24-48 hours. \
             Thanks for reaching out!",
            name = self.subject_name
        )
    }

    fn fallback(&self) -> String {
        format!(
            "I wasn't able to send your message due to a technical issue. \
             You can reach {} directly at {}. Sorry for the inconvenience!",
            self.subject_name, self.direct_contact
        )
    }
}

fn resolve_address(configured: &str) -> String {
    let trimmed = configured.trim();
    if trimmed.is_empty() {
        DEFAULT_RECIPIENT_EMAIL.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use twin_core::config::{AppConfig, DEFAULT_RECIPIENT_EMAIL};
    use twin_core::domain::contact::ContactRequest;

    use super::{ContactDispatcher, DispatchOutcome};
    use crate::contact::mailer::{MailError, Mailer, OutgoingEmail, SmtpMailer};
    use crate::contact::summarizer::ConversationSummarizer;
    use crate::contact::validator::{validate_request, ValidatedContactRequest};
    use crate::llm::LlmError;
    use crate::testing::{RecordingMailer, ScriptedModel};

    struct PanickingMailer;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            let bytes = self.0.lock().map(|bytes| bytes.clone()).unwrap_or_default();
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut bytes) = self.0.lock() {
                bytes.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Mailer for PanickingMailer {
        async fn send(&self, _email: &OutgoingEmail) -> Result<(), MailError> {
            panic!("mail transport exploded");
        }
    }

    fn request() -> ValidatedContactRequest {
        validate_request(ContactRequest {
            recruiter_address: "jane.doe@example.com".to_string(),
            message: "We have a staff engineer opening".to_string(),
            transcript: "user: what are your skills?\nassistant: Rust".to_string(),
        })
        .expect("valid request")
    }

    fn dispatcher(summary: Result<String, LlmError>, mailer: Arc<dyn Mailer>) -> ContactDispatcher {
        let config = AppConfig::default();
        let model = Arc::new(ScriptedModel::with_completion(summary));
        let summarizer = ConversationSummarizer::new(model, "Samuel");
        ContactDispatcher::new(summarizer, mailer, &config.contact, "Samuel")
    }

    #[tokio::test]
    async fn success_sends_message_first_and_confirms() {
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = dispatcher(Ok("- asked about Rust".to_string()), mailer.clone());

        let outcome = dispatcher.dispatch(&request(), "turn-1").await;

        assert!(outcome.is_delivered());
        assert!(outcome.message().contains("24-48 hours"));

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let email = &sent[0];
        assert_eq!(email.to, DEFAULT_RECIPIENT_EMAIL);
        assert_eq!(email.subject, "Career Twin: Message from recruiter (jane.doe@example.com)");
        let message_at = email.body.find("We have a staff engineer opening").expect("message");
        let summary_at = email.body.find("- asked about Rust").expect("summary");
        assert!(message_at < summary_at);
        assert!(email.body.trim_end().ends_with("jane.doe@example.com"));
    }

    #[tokio::test]
    async fn mail_failure_returns_fallback_with_direct_address() {
        let mailer =
            Arc::new(RecordingMailer::failing(MailError::Transport("connection reset".to_string())));
        let dispatcher = dispatcher(Ok("- summary".to_string()), mailer);

        let outcome = dispatcher.dispatch(&request(), "turn-1").await;

        assert!(matches!(outcome, DispatchOutcome::Fallback { reason: "mail", .. }));
        assert!(outcome.message().contains(DEFAULT_RECIPIENT_EMAIL));
        assert!(!outcome.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn summarizer_failure_skips_delivery() {
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher =
            dispatcher(Err(LlmError::Transport("dns failure".to_string())), mailer.clone());

        let outcome = dispatcher.dispatch(&request(), "turn-1").await;

        assert!(matches!(outcome, DispatchOutcome::Fallback { reason: "summarizer", .. }));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_smtp_credentials_degrade_to_fallback() {
        let config = AppConfig::default();
        let dispatcher = dispatcher(
            Ok("- summary".to_string()),
            Arc::new(SmtpMailer::from_config(&config.contact)),
        );

        let outcome = dispatcher.dispatch(&request(), "turn-1").await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Fallback { reason: "missing_credentials", .. }
        ));
    }

    #[tokio::test]
    async fn panicking_transport_is_absorbed() {
        let dispatcher = dispatcher(Ok("- summary".to_string()), Arc::new(PanickingMailer));

        let outcome = dispatcher.dispatch(&request(), "turn-1").await;

        assert!(matches!(outcome, DispatchOutcome::Fallback { reason: "panic", .. }));
        assert!(outcome.message().contains("directly at"));
    }

    #[test]
    fn blank_recipient_falls_back_to_default() {
        let mut config = AppConfig::default();
        config.contact.recipient_email = "   ".to_string();
        let model = Arc::new(ScriptedModel::with_completion(Ok(String::new())));
        let dispatcher = ContactDispatcher::new(
            ConversationSummarizer::new(model, "Samuel"),
            Arc::new(RecordingMailer::default()),
            &config.contact,
            "Samuel",
        );
        assert_eq!(dispatcher.recipient(), DEFAULT_RECIPIENT_EMAIL);
    }

    #[tokio::test]
    async fn dispatch_events_carry_the_turn_correlation_id() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mailer =
            Arc::new(RecordingMailer::failing(MailError::Transport("connection reset".to_string())));
        let dispatcher = dispatcher(Ok("- summary".to_string()), mailer);
        dispatcher.dispatch(&request(), "4b1c-turn").await;

        let output = logs.contents();
        assert!(output.contains("contact.dispatch.failed"));
        assert!(output.contains("correlation_id=\"4b1c-turn\""));
    }
}
