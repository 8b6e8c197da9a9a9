//! Passwordless identity providers.
//!
//! One [`IdentityProvider`] is built at start-up and shared through
//! [`AppState`](crate::state::AppState):
//!
//! - [`HostedIdentity`] delegates to the managed auth service.
//! - [`LocalIdentity`] issues its own one-time links and HS256 tokens,
//!   recording links and sessions in a [`CredentialLedger`].

use async_trait::async_trait;
use url::Url;
use wedflex_core::identity::{Identity, Session};
use wedflex_core::magic_link::CallbackExchange;
use wedflex_hosted::HostedError;

use crate::auth::mailer::MailError;
use crate::middleware::auth::{CurrentIdentity, Credential};

mod hosted;
mod ledger;
mod local;

pub use hosted::HostedIdentity;
pub use ledger::{CredentialLedger, MemoryLedger, PendingLink, PgLedger};
pub use local::{LocalIdentity, MAGIC_LINK_TTL_MINS};

/// Errors from identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The link, code or token was refused (expired, used, forged).
    #[error("{0}")]
    Rejected(String),

    /// The identity service failed; the message is shown to the user as-is.
    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("{0}")]
    Internal(String),
}

impl From<HostedError> for IdentityError {
    /// Client errors are refusals; everything else is an upstream failure.
    fn from(err: HostedError) -> Self {
        match err.status() {
            Some(status) if (400..500).contains(&status) && status != 429 => {
                IdentityError::Rejected(err.user_message())
            }
            _ => IdentityError::Upstream(err.user_message()),
        }
    }
}

/// Who is calling, how they sign in, and how they sign out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short name for logs and `/health`.
    fn name(&self) -> &'static str;

    /// Email a one-time sign-in link whose callback is `redirect_to`.
    async fn send_magic_link(&self, email: &str, redirect_to: &Url) -> Result<(), IdentityError>;

    /// Trade a callback fragment or code for a session.
    async fn exchange(&self, exchange: &CallbackExchange) -> Result<Session, IdentityError>;

    /// The identity behind a credential, or `None` if it does not resolve.
    async fn resolve(&self, credential: &Credential) -> Result<Option<Identity>, IdentityError>;

    /// Rotate a refresh token into a fresh session.
    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError>;

    /// Tear down the caller's server-side sessions.
    async fn sign_out(&self, caller: &CurrentIdentity) -> Result<(), IdentityError>;
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn api(status: u16, body: &str) -> HostedError {
        HostedError::Api {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn hosted_client_errors_are_rejections() {
        assert_matches!(
            IdentityError::from(api(403, r#"{"msg":"Token has expired or is invalid"}"#)),
            IdentityError::Rejected(msg) if msg == "Token has expired or is invalid"
        );
    }

    #[test]
    fn hosted_outages_and_rate_limits_are_upstream() {
        assert_matches!(
            IdentityError::from(api(503, "")),
            IdentityError::Upstream(_)
        );
        assert_matches!(
            IdentityError::from(api(429, r#"{"msg":"Too many requests"}"#)),
            IdentityError::Upstream(msg) if msg == "Too many requests"
        );
    }
}
