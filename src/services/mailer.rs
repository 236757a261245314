//! Plain-text mail for contact notifications and password resets.
//!
//! Mail is optional: without `SMTP_HOST` the service runs with no mailer and
//! callers log what they would have sent.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::env;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("could not deliver mail: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("bad mail address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    #[error("could not assemble message: {0}")]
    Message(#[from] lettre::error::Error),
}

/// SMTP relay settings. The relay is reached with STARTTLS.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    /// Sender, either `addr@host` or `Name <addr@host>`.
    pub from: String,
    pub credentials: Option<(String, String)>,
}

impl MailConfig {
    /// Reads `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_FROM` and the
    /// `SMTP_USER`/`SMTP_PASSWORD` pair. `None` when no host is set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        let host = var("SMTP_HOST")?;
        Some(Self {
            host,
            port: var("SMTP_PORT").and_then(|p| p.parse().ok()).unwrap_or(587),
            from: var("SMTP_FROM").unwrap_or_else(|| "Website <noreply@localhost>".to_string()),
            credentials: var("SMTP_USER").zip(var("SMTP_PASSWORD")),
        })
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Mailer backed by one pooled SMTP transport, built at startup.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Fails on a malformed sender or relay host; no connection is opened yet.
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if let Some((user, password)) = config.credentials {
            builder = builder.credentials(Credentials::new(user, password));
        }
        Ok(Self {
            from: config.from.parse()?,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(message).await?;
        tracing::info!(to, subject, "mail sent");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            host: "localhost".into(),
            port: 2525,
            from: "Website <noreply@example.com>".into(),
            credentials: None,
        }
    }

    #[test]
    fn malformed_sender_is_rejected_at_startup() {
        let err = SmtpMailer::new(MailConfig {
            from: "nobody".into(),
            ..config()
        })
        .err()
        .unwrap();
        assert!(matches!(err, MailError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn invalid_recipient_is_an_address_error() {
        let mailer = SmtpMailer::new(config()).unwrap();
        let err = mailer.send("not-an-email", "hi", "body").await.unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress(_)));
    }
}
