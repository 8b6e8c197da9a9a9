//! Repository for the `users` table.

use sqlx::PgPool;
use wedflex_core::types::EntityId;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, created_at, last_sign_in_at";

/// Users are created implicitly on their first completed sign-in.
pub struct UserRepo;

impl UserRepo {
    /// Create the user for `email` if needed and stamp `last_sign_in_at`.
    ///
    /// `email` must already be lower-cased.
    pub async fn upsert_signed_in(pool: &PgPool, email: &str) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, last_sign_in_at)
             VALUES ($1, NOW())
             ON CONFLICT ON CONSTRAINT uq_users_email
             DO UPDATE SET last_sign_in_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_one(pool)
            .await
    }

    /// Find a user by id.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
