use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use url::Url;
use wedflex_core::identity::{canonical_email, Identity, Session, BEARER_TOKEN_TYPE};
use wedflex_core::magic_link::CallbackExchange;

use super::{CredentialLedger, IdentityError, IdentityProvider, PendingLink};
use crate::auth::jwt::{
    generate_access_token, generate_opaque_token, hash_token, validate_token, JwtConfig,
};
use crate::auth::mailer::Mailer;
use crate::middleware::auth::{CurrentIdentity, Credential};

/// Lifetime of an emailed sign-in link.
pub const MAGIC_LINK_TTL_MINS: i64 = 15;

/// `type` marker on locally issued links.
const LINK_TYPE: &str = "magiclink";

const INVALID_LINK: &str = "Email link is invalid or has expired";
const INVALID_REFRESH: &str = "Invalid or expired refresh token";

/// Self-hosted passwordless sign-in.
pub struct LocalIdentity {
    ledger: Arc<dyn CredentialLedger>,
    mailer: Arc<dyn Mailer>,
    jwt: JwtConfig,
}

impl LocalIdentity {
    pub fn new(ledger: Arc<dyn CredentialLedger>, mailer: Arc<dyn Mailer>, jwt: JwtConfig) -> Self {
        Self {
            ledger,
            mailer,
            jwt,
        }
    }

    /// Issue an access token and a rotating refresh token.
    async fn issue_session(&self, user: Identity) -> Result<Session, IdentityError> {
        let access_token = generate_access_token(&user, &self.jwt)
            .map_err(|e| IdentityError::Internal(format!("Failed to sign access token: {e}")))?;
        let (refresh_token, refresh_hash) = generate_opaque_token();
        let expires_at = Utc::now() + Duration::days(self.jwt.refresh_token_expiry_days);
        self.ledger
            .create_session(user.id, &refresh_hash, expires_at)
            .await?;

        Ok(Session {
            access_token,
            refresh_token,
            expires_in: self.jwt.access_expiry_secs(),
            token_type: BEARER_TOKEN_TYPE.to_string(),
            user,
        })
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn send_magic_link(&self, email: &str, redirect_to: &Url) -> Result<(), IdentityError> {
        let email = canonical_email(email);
        let (token, token_hash) = generate_opaque_token();

        self.ledger
            .store_link(PendingLink {
                email: email.clone(),
                token_hash,
                redirect_to: redirect_to.to_string(),
                expires_at: Utc::now() + Duration::minutes(MAGIC_LINK_TTL_MINS),
            })
            .await?;

        let mut link = redirect_to.clone();
        link.query_pairs_mut()
            .append_pair("token_hash", &token)
            .append_pair("type", LINK_TYPE);

        self.mailer.send_sign_in_link(&email, &link).await?;
        Ok(())
    }

    async fn exchange(&self, exchange: &CallbackExchange) -> Result<Session, IdentityError> {
        if let Some(message) = exchange.error_message() {
            return Err(IdentityError::Rejected(message));
        }

        match exchange {
            // Tokens handed back verbatim: trust them only if we signed them.
            CallbackExchange::Fragment(_) => {
                let access_token = exchange
                    .param("access_token")
                    .ok_or_else(|| IdentityError::Rejected(INVALID_LINK.into()))?;
                let claims = validate_token(&access_token, &self.jwt)
                    .map_err(|_| IdentityError::Rejected(INVALID_LINK.into()))?;
                let remaining = claims.exp - Utc::now().timestamp();
                Ok(Session {
                    access_token,
                    refresh_token: exchange.param("refresh_token").unwrap_or_default(),
                    expires_in: remaining.max(0),
                    token_type: BEARER_TOKEN_TYPE.to_string(),
                    user: claims.into(),
                })
            }
            CallbackExchange::Query(_) => {
                let token = exchange
                    .code()
                    .ok_or_else(|| IdentityError::Rejected(INVALID_LINK.into()))?;
                let email = self
                    .ledger
                    .consume_link(&hash_token(&token))
                    .await?
                    .ok_or_else(|| IdentityError::Rejected(INVALID_LINK.into()))?;
                let user = self.ledger.upsert_user(&email).await?;
                tracing::info!(user_id = %user.id, "Magic link redeemed");
                self.issue_session(user).await
            }
        }
    }

    async fn resolve(&self, credential: &Credential) -> Result<Option<Identity>, IdentityError> {
        let Some(token) = credential.bearer_token() else {
            return Ok(None);
        };
        Ok(validate_token(token, &self.jwt).ok().map(Into::into))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let user_id = self
            .ledger
            .take_session(&hash_token(refresh_token))
            .await?
            .ok_or_else(|| IdentityError::Rejected(INVALID_REFRESH.into()))?;
        let user = self
            .ledger
            .find_user(user_id)
            .await?
            .ok_or_else(|| IdentityError::Rejected(INVALID_REFRESH.into()))?;
        self.issue_session(user).await
    }

    async fn sign_out(&self, caller: &CurrentIdentity) -> Result<(), IdentityError> {
        let revoked = self.ledger.revoke_all(caller.identity.id).await?;
        tracing::info!(user_id = %caller.identity.id, revoked, "Sessions revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wedflex_core::magic_link::plan_callback;

    use super::*;
    use crate::auth::mailer::Outbox;
    use crate::services::identity::MemoryLedger;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn provider() -> (LocalIdentity, Arc<Outbox>) {
        let outbox = Arc::new(Outbox::new());
        let identity = LocalIdentity::new(Arc::new(MemoryLedger::new()), outbox.clone(), jwt());
        (identity, outbox)
    }

    fn callback() -> Url {
        Url::parse("http://localhost:3000/auth/callback?role=couple&next=%2Fpost-offer").unwrap()
    }

    async fn sign_in(identity: &LocalIdentity, outbox: &Outbox, email: &str) -> Session {
        identity.send_magic_link(email, &callback()).await.unwrap();
        let link = outbox.last_link_for(&canonical_email(email)).await.unwrap();
        let exchange = plan_callback(&link).exchange.unwrap();
        identity.exchange(&exchange).await.unwrap()
    }

    #[tokio::test]
    async fn magic_link_round_trip_resolves_same_identity() {
        let (identity, outbox) = provider();
        let session = sign_in(&identity, &outbox, " Pat@Example.com ").await;
        assert_eq!(session.user.email.as_deref(), Some("pat@example.com"));

        let resolved = identity
            .resolve(&Credential::bearer(&session.access_token))
            .await
            .unwrap();
        assert_eq!(resolved, Some(session.user));
    }

    #[tokio::test]
    async fn link_keeps_continuation_and_works_once() {
        let (identity, outbox) = provider();
        identity.send_magic_link("pat@example.com", &callback()).await.unwrap();
        let link = outbox.last_link_for("pat@example.com").await.unwrap();
        let plan = plan_callback(&link);
        assert_eq!(plan.next, "/post-offer");

        let exchange = plan.exchange.unwrap();
        identity.exchange(&exchange).await.unwrap();
        assert_matches!(
            identity.exchange(&exchange).await,
            Err(IdentityError::Rejected(_))
        );
    }

    #[tokio::test]
    async fn refresh_rotates_token() {
        let (identity, outbox) = provider();
        let session = sign_in(&identity, &outbox, "pat@example.com").await;

        let refreshed = identity.refresh(&session.refresh_token).await.unwrap();
        assert_eq!(refreshed.user.id, session.user.id);
        assert_ne!(refreshed.refresh_token, session.refresh_token);
        assert_matches!(
            identity.refresh(&session.refresh_token).await,
            Err(IdentityError::Rejected(_))
        );
    }

    #[tokio::test]
    async fn sign_out_revokes_refresh_tokens() {
        let (identity, outbox) = provider();
        let session = sign_in(&identity, &outbox, "pat@example.com").await;
        let caller = CurrentIdentity {
            identity: session.user.clone(),
            credential: Credential::bearer(&session.access_token),
        };
        identity.sign_out(&caller).await.unwrap();
        assert_matches!(
            identity.refresh(&session.refresh_token).await,
            Err(IdentityError::Rejected(_))
        );
    }

    #[tokio::test]
    async fn garbage_credentials_do_not_resolve() {
        let (identity, _) = provider();
        assert_eq!(
            identity.resolve(&Credential::bearer("not-a-jwt")).await.unwrap(),
            None
        );
        assert_eq!(
            identity.resolve(&Credential::new("Basic abc")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn error_in_link_is_rejected_with_its_message() {
        let (identity, _) = provider();
        let exchange = CallbackExchange::Fragment("error_description=Link+expired".into());
        assert_matches!(
            identity.exchange(&exchange).await,
            Err(IdentityError::Rejected(msg)) if msg == "Link expired"
        );
    }
}
