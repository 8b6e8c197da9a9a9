//! One-time sign-in link model and DTOs.

use sqlx::FromRow;
use wedflex_core::types::Timestamp;

/// A row from the `magic_links` table. Only the token hash is stored.
#[derive(Debug, Clone, FromRow)]
pub struct MagicLink {
    pub id: i64,
    pub email: String,
    pub token_hash: String,
    pub redirect_to: String,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for issuing a new link.
pub struct CreateMagicLink {
    pub email: String,
    pub token_hash: String,
    pub redirect_to: String,
    pub expires_at: Timestamp,
}
