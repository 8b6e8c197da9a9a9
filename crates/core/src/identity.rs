//! Authenticated identity and session types shared by every provider.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// The authenticated couple behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: EntityId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued after a successful sign-in or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub token_type: String,
    pub user: Identity,
}

/// Token type reported in every [`Session`].
pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// Normalize an email for lookup and storage.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}
