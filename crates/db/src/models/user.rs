//! User entity model.

use sqlx::FromRow;
use wedflex_core::identity::Identity;
use wedflex_core::types::{EntityId, Timestamp};

/// A row from the `users` table. Emails are stored lower-cased.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub created_at: Timestamp,
    pub last_sign_in_at: Option<Timestamp>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Identity {
            id: user.id,
            email: Some(user.email),
        }
    }
}
