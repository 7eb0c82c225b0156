use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use twin_core::config::ContactConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("sender address and password must both be configured")]
    MissingCredentials,
    #[error("invalid mailbox `{address}`: {reason}")]
    Address { address: String, reason: String },
    #[error("could not build message: {0}")]
    Build(String),
    #[error("smtp transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// STARTTLS + login delivery. Credentials are read per send, so missing
/// secrets only surface when a message is actually dispatched.
#[derive(Clone, Debug)]
pub struct SmtpMailer {
    config: ContactConfig,
}

impl SmtpMailer {
    pub fn from_config(config: &ContactConfig) -> Self {
        Self { config: config.clone() }
    }

    fn credentials(&self) -> Result<(String, String), MailError> {
        self.config
            .sender_credentials()
            .map(|(address, password)| (address.to_string(), password.to_string()))
            .ok_or(MailError::MissingCredentials)
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse::<Mailbox>().map_err(|error| MailError::Address {
        address: address.to_string(),
        reason: error.to_string(),
    })
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let (sender, password) = self.credentials()?;

        let message = Message::builder()
            .from(mailbox(&sender)?)
            .to(mailbox(&email.to)?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|error| MailError::Build(error.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
            .map_err(|error| MailError::Transport(error.to_string()))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(sender, password))
            .build();

        transport.send(message).await.map_err(|error| MailError::Transport(error.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use twin_core::config::{AppConfig, ContactConfig};

    use super::{MailError, Mailer, OutgoingEmail, SmtpMailer};

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "owner@example.com".to_string(),
            subject: "subject".to_string(),
            body: "body".to_string(),
        }
    }

    fn contact(address: Option<&str>, password: Option<&str>) -> ContactConfig {
        let mut config = AppConfig::default().contact;
        config.smtp_host = "smtp.example.com".to_string();
        config.sender_address = address.map(|value| value.to_string().into());
        config.sender_password = password.map(|value| value.to_string().into());
        config
    }

    #[tokio::test]
    async fn missing_credentials_fail_at_send_time() {
        let mailer = SmtpMailer::from_config(&contact(None, None));
        assert_eq!(mailer.send(&email()).await, Err(MailError::MissingCredentials));
    }

    #[tokio::test]
    async fn blank_password_counts_as_missing() {
        let mailer = SmtpMailer::from_config(&contact(Some("bot@example.com"), Some("")));
        assert_eq!(mailer.send(&email()).await, Err(MailError::MissingCredentials));
    }

    #[tokio::test]
    async fn whitespace_password_matches_the_readiness_check() {
        let config = contact(Some("bot@example.com"), Some("   "));
        assert!(config.sender_credentials().is_none());

        let mailer = SmtpMailer::from_config(&config);
        assert_eq!(mailer.send(&email()).await, Err(MailError::MissingCredentials));
    }

    #[tokio::test]
    async fn invalid_sender_is_reported_before_connecting() {
        let mailer = SmtpMailer::from_config(&contact(Some("not an address"), Some("secret")));
        assert!(matches!(mailer.send(&email()).await, Err(MailError::Address { .. })));
    }
}
