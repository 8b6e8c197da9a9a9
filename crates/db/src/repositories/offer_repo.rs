//! Repository for the `service_requests` table.

use sqlx::PgPool;
use wedflex_core::offer::NewOffer;
use wedflex_core::types::EntityId;

use crate::models::offer::OfferRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, couple_id, title, category, location, service_date, event_at, \
                        guest_count, details, inspiration_link, inspiration_images, offer_cents, \
                        accepted_terms, status, client_request_id, created_at";

/// Offers are created once and read back by their owner; there is no update path.
pub struct OfferRepo;

impl OfferRepo {
    /// Insert a new offer, returning the created row.
    ///
    /// Returns `None` when the couple already has an offer with the same
    /// `client_request_id`; the caller should read that row instead.
    pub async fn insert(pool: &PgPool, input: &NewOffer) -> Result<Option<OfferRow>, sqlx::Error> {
        let offer = &input.offer;
        let query = format!(
            "INSERT INTO service_requests (
                couple_id, title, category, location, service_date, event_at, guest_count,
                details, inspiration_link, inspiration_images, offer_cents, accepted_terms,
                status, client_request_id
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT ON CONSTRAINT uq_service_requests_couple_request DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OfferRow>(&query)
            .bind(input.couple_id)
            .bind(&offer.title)
            .bind(&offer.category)
            .bind(&offer.location)
            .bind(offer.service_date)
            .bind(offer.event_at)
            .bind(offer.guest_count)
            .bind(&offer.details)
            .bind(&offer.inspiration_link)
            .bind(&offer.inspiration_images)
            .bind(offer.offer_cents)
            .bind(offer.accepted_terms)
            .bind(input.status.as_str())
            .bind(offer.client_request_id)
            .fetch_optional(pool)
            .await
    }

    /// Find one of a couple's offers by id.
    pub async fn find_by_id(
        pool: &PgPool,
        couple_id: EntityId,
        id: EntityId,
    ) -> Result<Option<OfferRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM service_requests WHERE id = $1 AND couple_id = $2");
        sqlx::query_as::<_, OfferRow>(&query)
            .bind(id)
            .bind(couple_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the offer a couple created with the given idempotency key.
    pub async fn find_by_request_id(
        pool: &PgPool,
        couple_id: EntityId,
        client_request_id: EntityId,
    ) -> Result<Option<OfferRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM service_requests
             WHERE couple_id = $1 AND client_request_id = $2"
        );
        sqlx::query_as::<_, OfferRow>(&query)
            .bind(couple_id)
            .bind(client_request_id)
            .fetch_optional(pool)
            .await
    }

    /// List a couple's offers, newest first.
    pub async fn list_for_couple(
        pool: &PgPool,
        couple_id: EntityId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OfferRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM service_requests
             WHERE couple_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, OfferRow>(&query)
            .bind(couple_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
