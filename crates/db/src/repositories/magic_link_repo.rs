//! Repository for the `magic_links` table.

use sqlx::PgPool;

use crate::models::magic_link::{CreateMagicLink, MagicLink};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, token_hash, redirect_to, expires_at, consumed_at, created_at";

/// Issues and consumes one-time sign-in links.
pub struct MagicLinkRepo;

impl MagicLinkRepo {
    /// Insert a new link, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateMagicLink) -> Result<MagicLink, sqlx::Error> {
        let query = format!(
            "INSERT INTO magic_links (email, token_hash, redirect_to, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MagicLink>(&query)
            .bind(&input.email)
            .bind(&input.token_hash)
            .bind(&input.redirect_to)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Mark the link with `token_hash` as used.
    ///
    /// Returns `None` when no unexpired, unconsumed link matches. A link can
    /// be consumed at most once even under concurrent callbacks.
    pub async fn consume(pool: &PgPool, token_hash: &str) -> Result<Option<MagicLink>, sqlx::Error> {
        let query = format!(
            "UPDATE magic_links SET consumed_at = NOW()
             WHERE token_hash = $1
               AND consumed_at IS NULL
               AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MagicLink>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Delete expired or consumed links. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM magic_links WHERE expires_at < NOW() OR consumed_at IS NOT NULL",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
