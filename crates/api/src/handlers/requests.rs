//! Handlers for the `/requests` resource: posting offers directly and
//! reading back the caller's own offers.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use wedflex_core::error::CoreError;
use wedflex_core::offer::Offer;
use wedflex_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use wedflex_core::service_request::{parse_service_request, SchemaErrors};
use wedflex_core::types::EntityId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{CurrentIdentity, MaybeCredential};
use crate::query::PaginationParams;
use crate::response::OkResponse;
use crate::services::submission::submit_offer;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreatedOffer {
    pub id: EntityId,
}

#[derive(Debug, Serialize)]
pub struct OfferList {
    pub offers: Vec<Offer>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct OfferDetail {
    pub offer: Offer,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/requests
///
/// The body is checked against the request schema before the caller is
/// resolved, so a malformed body is a 400 even without a session.
pub async fn create_request(
    State(state): State<AppState>,
    MaybeCredential(credential): MaybeCredential,
    body: Bytes,
) -> AppResult<Json<OkResponse<CreatedOffer>>> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        let mut errors = SchemaErrors::default();
        errors.form(format!("Request body is not valid JSON: {e}"));
        AppError::Schema(errors)
    })?;
    let parsed = parse_service_request(value).map_err(AppError::Schema)?;

    let caller = CurrentIdentity::require(&state, credential).await?;
    let offer = parsed.into_offer()?;

    let submission = submit_offer(state.offers.as_ref(), &caller, offer).await?;

    Ok(Json(OkResponse::new(CreatedOffer {
        id: submission.offer.id,
    })))
}

/// GET /api/requests
///
/// The caller's offers, newest first.
pub async fn list_requests(
    caller: CurrentIdentity,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<OkResponse<OfferList>>> {
    let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let offset = clamp_offset(params.offset);
    let offers = state.offers.list_for_couple(&caller, limit, offset).await?;

    Ok(Json(OkResponse::new(OfferList {
        offers,
        limit,
        offset,
    })))
}

/// GET /api/requests/{id}
pub async fn get_request(
    caller: CurrentIdentity,
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<OkResponse<OfferDetail>>> {
    let offer = state
        .offers
        .find_by_id(&caller, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Offer",
                id: id.to_string(),
            })
        })?;

    Ok(Json(OkResponse::new(OfferDetail { offer })))
}
