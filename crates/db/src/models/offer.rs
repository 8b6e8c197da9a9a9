//! `service_requests` row model.

use chrono::NaiveDate;
use sqlx::FromRow;
use wedflex_core::offer::Offer;
use wedflex_core::types::{EntityId, LocalTimestamp, Timestamp};

/// A row from the `service_requests` table.
#[derive(Debug, Clone, FromRow)]
pub struct OfferRow {
    pub id: EntityId,
    pub couple_id: EntityId,
    pub title: String,
    pub category: String,
    pub location: String,
    pub service_date: Option<NaiveDate>,
    pub event_at: Option<LocalTimestamp>,
    pub guest_count: Option<i32>,
    pub details: Option<String>,
    pub inspiration_link: Option<String>,
    pub inspiration_images: Option<Vec<String>>,
    pub offer_cents: Option<i64>,
    pub accepted_terms: bool,
    pub status: String,
    pub client_request_id: Option<EntityId>,
    pub created_at: Timestamp,
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        Offer {
            id: row.id,
            couple_id: row.couple_id,
            title: row.title,
            category: Some(row.category),
            location: Some(row.location),
            service_date: row.service_date,
            event_at: row.event_at,
            guest_count: row.guest_count,
            details: row.details,
            inspiration_link: row.inspiration_link,
            inspiration_images: row.inspiration_images,
            offer_cents: row.offer_cents,
            accepted_terms: row.accepted_terms,
            status: row.status,
            client_request_id: row.client_request_id,
            created_at: Some(row.created_at),
        }
    }
}
