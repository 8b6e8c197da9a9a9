//! The offer (service request) entity and its creation payload.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntityId, LocalTimestamp, Timestamp};

/// Name of the table (or REST resource) holding offers.
pub const OFFERS_TABLE: &str = "service_requests";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Offer status. Only `open` is ever written by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Open,
}

impl OfferStatus {
    /// Parse a status string from the store.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "open" => Ok(Self::Open),
            _ => Err(CoreError::Validation(format!(
                "Invalid offer status '{s}'. Must be: open"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
        }
    }
}

// ---------------------------------------------------------------------------
// Creation payload
// ---------------------------------------------------------------------------

/// Offer values after normalization, before ownership is attached.
///
/// Absent optional values serialize as `null`, except `inspiration_images`
/// and `client_request_id`, which are left out of the payload entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOffer {
    pub title: String,
    pub category: String,
    pub location: String,
    pub service_date: Option<NaiveDate>,
    pub event_at: Option<LocalTimestamp>,
    pub guest_count: Option<i32>,
    pub details: Option<String>,
    pub inspiration_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspiration_images: Option<Vec<String>>,
    pub offer_cents: Option<i64>,
    pub accepted_terms: bool,
    /// Client-generated idempotency key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_request_id: Option<EntityId>,
}

/// The single record inserted per submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOffer {
    #[serde(flatten)]
    pub offer: NormalizedOffer,
    pub couple_id: EntityId,
    pub status: OfferStatus,
}

impl NewOffer {
    /// Attach the owner; every new offer starts `open`.
    pub fn open(offer: NormalizedOffer, couple_id: EntityId) -> Self {
        Self {
            offer,
            couple_id,
            status: OfferStatus::Open,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted offer
// ---------------------------------------------------------------------------

/// An offer as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: EntityId,
    pub couple_id: EntityId,
    pub title: String,
    pub category: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub service_date: Option<NaiveDate>,
    #[serde(default)]
    pub event_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub guest_count: Option<i32>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub inspiration_link: Option<String>,
    #[serde(default)]
    pub inspiration_images: Option<Vec<String>>,
    #[serde(default)]
    pub offer_cents: Option<i64>,
    #[serde(default)]
    pub accepted_terms: bool,
    pub status: String,
    #[serde(default)]
    pub client_request_id: Option<EntityId>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl Offer {
    /// Materialize a stored offer from its insert payload.
    pub fn from_new(id: EntityId, new: NewOffer, created_at: Timestamp) -> Self {
        let NewOffer {
            offer,
            couple_id,
            status,
        } = new;
        Self {
            id,
            couple_id,
            title: offer.title,
            category: Some(offer.category),
            location: Some(offer.location),
            service_date: offer.service_date,
            event_at: offer.event_at,
            guest_count: offer.guest_count,
            details: offer.details,
            inspiration_link: offer.inspiration_link,
            inspiration_images: offer.inspiration_images,
            offer_cents: offer.offer_cents,
            accepted_terms: offer.accepted_terms,
            status: status.as_str().to_string(),
            client_request_id: offer.client_request_id,
            created_at: Some(created_at),
        }
    }
}
