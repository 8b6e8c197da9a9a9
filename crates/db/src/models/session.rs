//! User session model and DTOs.

use sqlx::FromRow;
use wedflex_core::types::{EntityId, Timestamp};

/// A user session row from the `user_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: i64,
    pub user_id: EntityId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new user session.
pub struct CreateSession {
    pub user_id: EntityId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
}
