//! Delivery of one-time sign-in links.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport. When `SMTP_HOST`
//! is not set, [`EmailConfig::from_lookup`] returns `None` and the service
//! falls back to an [`Outbox`], which keeps the messages in memory and logs
//! them so a developer can follow the link by hand.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "WedFlex <noreply@wedflex.local>";

const SUBJECT: &str = "Your WedFlex sign-in link";

/// Configuration for SMTP delivery.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                            |
    /// |-----------------|----------|------------------------------------|
    /// | `SMTP_HOST`     | yes      | --                                 |
    /// | `SMTP_PORT`     | no       | `587`                              |
    /// | `SMTP_FROM`     | no       | `WedFlex <noreply@wedflex.local>`  |
    /// | `SMTP_USER`     | no       | --                                 |
    /// | `SMTP_PASSWORD` | no       | --                                 |
    pub fn from_lookup(get: &impl Fn(&str) -> Option<String>) -> Option<Self> {
        let smtp_host = get("SMTP_HOST").filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: get("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: get("SMTP_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: get("SMTP_USER"),
            smtp_password: get("SMTP_PASSWORD"),
        })
    }
}

/// Plain-text body of the sign-in email.
pub fn sign_in_body(link: &Url) -> String {
    format!(
        "Tap the link below to sign in to WedFlex. It works once and expires in 15 minutes.\n\n{link}\n\n\
         If you did not ask to sign in, you can ignore this email."
    )
}

// ---------------------------------------------------------------------------
// Mailer seam
// ---------------------------------------------------------------------------

/// Sends one-time sign-in links.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_sign_in_link(&self, to_email: &str, link: &Url) -> Result<(), MailError>;
}

/// Sends sign-in links via SMTP.
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_sign_in_link(&self, to_email: &str, link: &Url) -> Result<(), MailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(sign_in_body(link))
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(email).await?;

        tracing::info!(smtp_host = %self.config.smtp_host, "Sign-in email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// A message captured by the [`Outbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    pub to: String,
    pub link: Url,
}

/// Messages the [`Outbox`] holds before the oldest are dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// In-memory mailer used when SMTP is not configured.
///
/// Only the latest [`OUTBOX_CAPACITY`] messages are kept.
#[derive(Default)]
pub struct Outbox {
    messages: Mutex<VecDeque<OutboxMessage>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retained messages, oldest first.
    pub async fn messages(&self) -> Vec<OutboxMessage> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// The most recent link sent to `email`.
    pub async fn last_link_for(&self, email: &str) -> Option<Url> {
        self.messages
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == email)
            .map(|m| m.link.clone())
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send_sign_in_link(&self, to_email: &str, link: &Url) -> Result<(), MailError> {
        tracing::warn!("SMTP not configured; sign-in link kept in the outbox");
        tracing::debug!(%link, "Outbox sign-in link");
        let mut messages = self.messages.lock().await;
        if messages.len() >= OUTBOX_CAPACITY {
            messages.pop_front();
        }
        messages.push_back(OutboxMessage {
            to: to_email.to_string(),
            link: link.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_config_is_optional() {
        assert!(EmailConfig::from_lookup(&|_| None).is_none());
        let cfg = EmailConfig::from_lookup(&|k| (k == "SMTP_HOST").then(|| "smtp.example".into()))
            .unwrap();
        assert_eq!(cfg.smtp_port, DEFAULT_SMTP_PORT);
        assert_eq!(cfg.from_address, DEFAULT_FROM_ADDRESS);
    }

    #[tokio::test]
    async fn outbox_keeps_latest_link_per_recipient() {
        let outbox = Outbox::new();
        let first = Url::parse("http://localhost:3000/auth/callback?token_hash=a").unwrap();
        let second = Url::parse("http://localhost:3000/auth/callback?token_hash=b").unwrap();
        outbox.send_sign_in_link("pat@example.com", &first).await.unwrap();
        outbox.send_sign_in_link("pat@example.com", &second).await.unwrap();
        assert_eq!(outbox.last_link_for("pat@example.com").await, Some(second));
        assert_eq!(outbox.last_link_for("sam@example.com").await, None);
        assert_eq!(outbox.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn outbox_drops_oldest_messages_past_capacity() {
        let outbox = Outbox::new();
        for n in 0..OUTBOX_CAPACITY * 4 {
            let link = Url::parse(&format!("http://localhost:3000/auth/callback?token_hash={n}"))
                .unwrap();
            outbox
                .send_sign_in_link(&format!("guest{}@example.com", n % 7), &link)
                .await
                .unwrap();
        }

        let messages = outbox.messages().await;
        assert_eq!(messages.len(), OUTBOX_CAPACITY);
        let last = OUTBOX_CAPACITY * 4 - 1;
        assert_eq!(
            outbox.last_link_for(&format!("guest{}@example.com", last % 7)).await,
            Some(Url::parse(&format!("http://localhost:3000/auth/callback?token_hash={last}")).unwrap())
        );
        assert!(messages[0].link.as_str().ends_with(&format!("={}", OUTBOX_CAPACITY * 3)));
    }

    #[test]
    fn body_contains_link() {
        let link = Url::parse("http://localhost:3000/auth/callback").unwrap();
        assert!(sign_in_body(&link).contains("http://localhost:3000/auth/callback"));
    }
}
