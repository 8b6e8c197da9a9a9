//! Where the self-hosted provider keeps one-time links, users and refresh
//! sessions. Only token hashes are ever stored.
//!
//! Storing a link or a session first drops links and sessions that can no
//! longer be used, so neither grows with traffic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use wedflex_core::identity::Identity;
use wedflex_core::types::{EntityId, Timestamp};
use wedflex_db::models::magic_link::CreateMagicLink;
use wedflex_db::models::session::CreateSession;
use wedflex_db::repositories::{MagicLinkRepo, SessionRepo, UserRepo};
use wedflex_db::DbPool;

use super::IdentityError;

/// A freshly issued sign-in link, by hash.
#[derive(Debug, Clone)]
pub struct PendingLink {
    pub email: String,
    pub token_hash: String,
    pub redirect_to: String,
    pub expires_at: Timestamp,
}

#[async_trait]
pub trait CredentialLedger: Send + Sync {
    async fn store_link(&self, link: PendingLink) -> Result<(), IdentityError>;

    /// Mark a link used. Returns its email, or `None` if it is unknown,
    /// expired or already consumed.
    async fn consume_link(&self, token_hash: &str) -> Result<Option<String>, IdentityError>;

    /// Find or create the user for a canonical email and stamp the sign-in.
    async fn upsert_user(&self, email: &str) -> Result<Identity, IdentityError>;

    async fn find_user(&self, id: EntityId) -> Result<Option<Identity>, IdentityError>;

    async fn create_session(
        &self,
        user_id: EntityId,
        refresh_token_hash: &str,
        expires_at: Timestamp,
    ) -> Result<(), IdentityError>;

    /// Revoke an active session and return its user, so each refresh token
    /// works once.
    async fn take_session(&self, refresh_token_hash: &str)
        -> Result<Option<EntityId>, IdentityError>;

    /// Revoke every session of a user. Returns how many were revoked.
    async fn revoke_all(&self, user_id: EntityId) -> Result<u64, IdentityError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgLedger {
    pool: DbPool,
}

impl PgLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialLedger for PgLedger {
    async fn store_link(&self, link: PendingLink) -> Result<(), IdentityError> {
        let input = CreateMagicLink {
            email: link.email,
            token_hash: link.token_hash,
            redirect_to: link.redirect_to,
            expires_at: link.expires_at,
        };
        let pruned = MagicLinkRepo::cleanup_expired(&self.pool).await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped stale sign-in links");
        }
        MagicLinkRepo::create(&self.pool, &input).await?;
        Ok(())
    }

    async fn consume_link(&self, token_hash: &str) -> Result<Option<String>, IdentityError> {
        let link = MagicLinkRepo::consume(&self.pool, token_hash).await?;
        Ok(link.map(|l| l.email))
    }

    async fn upsert_user(&self, email: &str) -> Result<Identity, IdentityError> {
        Ok(UserRepo::upsert_signed_in(&self.pool, email).await?.into())
    }

    async fn find_user(&self, id: EntityId) -> Result<Option<Identity>, IdentityError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?.map(Into::into))
    }

    async fn create_session(
        &self,
        user_id: EntityId,
        refresh_token_hash: &str,
        expires_at: Timestamp,
    ) -> Result<(), IdentityError> {
        let input = CreateSession {
            user_id,
            refresh_token_hash: refresh_token_hash.to_string(),
            expires_at,
        };
        let pruned = SessionRepo::cleanup_expired(&self.pool).await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped dead sessions");
        }
        SessionRepo::create(&self.pool, &input).await?;
        Ok(())
    }

    async fn take_session(
        &self,
        refresh_token_hash: &str,
    ) -> Result<Option<EntityId>, IdentityError> {
        let Some(session) =
            SessionRepo::find_by_refresh_token_hash(&self.pool, refresh_token_hash).await?
        else {
            return Ok(None);
        };
        // A concurrent refresh may have revoked it between the two queries.
        let revoked = SessionRepo::revoke(&self.pool, session.id).await?;
        Ok(revoked.then_some(session.user_id))
    }

    async fn revoke_all(&self, user_id: EntityId) -> Result<u64, IdentityError> {
        Ok(SessionRepo::revoke_all_for_user(&self.pool, user_id).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

struct StoredLink {
    email: String,
    expires_at: Timestamp,
}

struct StoredSession {
    user_id: EntityId,
    expires_at: Timestamp,
}

/// Consumed links and revoked sessions are removed outright; expired ones
/// are dropped on the next store.
#[derive(Default)]
struct LedgerInner {
    links: HashMap<String, StoredLink>,
    /// Users keyed by canonical email.
    users: HashMap<String, Identity>,
    sessions: HashMap<String, StoredSession>,
}

/// Process-local ledger for development and tests.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialLedger for MemoryLedger {
    async fn store_link(&self, link: PendingLink) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        inner.links.retain(|_, l| l.expires_at > now);
        inner.links.insert(
            link.token_hash,
            StoredLink {
                email: link.email,
                expires_at: link.expires_at,
            },
        );
        Ok(())
    }

    async fn consume_link(&self, token_hash: &str) -> Result<Option<String>, IdentityError> {
        let mut inner = self.inner.lock().await;
        let link = inner.links.remove(token_hash);
        Ok(link
            .filter(|l| l.expires_at > Utc::now())
            .map(|l| l.email))
    }

    async fn upsert_user(&self, email: &str) -> Result<Identity, IdentityError> {
        let mut inner = self.inner.lock().await;
        let identity = inner
            .users
            .entry(email.to_string())
            .or_insert_with(|| Identity {
                id: EntityId::new_v4(),
                email: Some(email.to_string()),
            });
        Ok(identity.clone())
    }

    async fn find_user(&self, id: EntityId) -> Result<Option<Identity>, IdentityError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.id == id).cloned())
    }

    async fn create_session(
        &self,
        user_id: EntityId,
        refresh_token_hash: &str,
        expires_at: Timestamp,
    ) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        inner.sessions.retain(|_, s| s.expires_at > now);
        inner.sessions.insert(
            refresh_token_hash.to_string(),
            StoredSession {
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn take_session(
        &self,
        refresh_token_hash: &str,
    ) -> Result<Option<EntityId>, IdentityError> {
        let mut inner = self.inner.lock().await;
        let session = inner.sessions.remove(refresh_token_hash);
        Ok(session
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id))
    }

    async fn revoke_all(&self, user_id: EntityId) -> Result<u64, IdentityError> {
        let mut inner = self.inner.lock().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - inner.sessions.len()) as u64)
    }
}
