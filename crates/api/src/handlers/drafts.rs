//! Handlers for server-held offer wizards (`/offer-drafts`).
//!
//! Each handler resolves the caller once, then runs one wizard transition
//! under the draft store's lock. Validation failures leave the draft as it
//! was, entered values included.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use wedflex_core::error::CoreError;
use wedflex_core::magic_link::sign_in_path;
use wedflex_core::types::{EntityId, Timestamp};
use wedflex_core::wizard::{
    DraftPatch, FlowVariant, OfferDraft, SubmitReadiness, WizardOptions, WizardStep,
    POSTED_REDIRECT,
};

use crate::drafts::DraftSnapshot;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::MaybeIdentity;
use crate::response::{Empty, OkResponse};
use crate::services::submission::submit_offer;
use crate::state::AppState;

const SUBMIT_SIGN_IN_MESSAGE: &str = "Please sign in to post your offer.";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /offer-drafts`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateDraftRequest {
    #[serde(default)]
    pub variant: FlowVariant,
}

/// A draft as the client sees it.
#[derive(Debug, Serialize)]
pub struct DraftView {
    pub id: EntityId,
    pub variant: FlowVariant,
    /// 1-based step number.
    pub step: u8,
    pub step_name: WizardStep,
    pub step_label: &'static str,
    pub options: WizardOptions,
    pub fields: OfferDraft,
    /// Idempotency key sent with the eventual submission.
    pub request_id: EntityId,
    pub updated_at: Timestamp,
}

impl From<DraftSnapshot> for DraftView {
    fn from(snapshot: DraftSnapshot) -> Self {
        let wizard = snapshot.wizard;
        Self {
            id: snapshot.id,
            variant: wizard.variant,
            step: wizard.step.to_number(),
            step_name: wizard.step,
            step_label: wizard.step.label(),
            options: wizard.options(),
            fields: wizard.draft,
            request_id: wizard.request_id,
            updated_at: snapshot.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DraftBody {
    pub draft: DraftView,
}

impl DraftBody {
    fn ok(snapshot: DraftSnapshot) -> Json<OkResponse<DraftBody>> {
        Json(OkResponse::new(DraftBody {
            draft: snapshot.into(),
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct DraftImageBody {
    pub url: String,
    pub draft: DraftView,
}

#[derive(Debug, Serialize)]
pub struct PostedOffer {
    pub id: EntityId,
    /// Where the client should go next.
    pub redirect_to: &'static str,
    pub deduplicated: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/offer-drafts
pub async fn create_draft(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Json(input): Json<CreateDraftRequest>,
) -> (StatusCode, Json<OkResponse<DraftBody>>) {
    let owner = caller.map(|c| c.identity.id);
    let snapshot = state.drafts.create(input.variant, owner).await;

    tracing::info!(draft_id = %snapshot.id, variant = ?input.variant, couple_id = ?owner, "Offer draft started");

    (StatusCode::CREATED, DraftBody::ok(snapshot))
}

/// GET /api/offer-drafts/{id}
pub async fn get_draft(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Path(id): Path<EntityId>,
) -> AppResult<Json<OkResponse<DraftBody>>> {
    let owner = caller.map(|c| c.identity.id);
    let snapshot = state.drafts.get(id, owner).await?;
    Ok(DraftBody::ok(snapshot))
}

/// PATCH /api/offer-drafts/{id}
///
/// Overwrite the given fields. Never validates.
pub async fn update_draft(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Path(id): Path<EntityId>,
    Json(patch): Json<DraftPatch>,
) -> AppResult<Json<OkResponse<DraftBody>>> {
    let owner = caller.map(|c| c.identity.id);
    let (snapshot, ()) = state
        .drafts
        .update(id, owner, |wizard| {
            wizard.update(patch);
            Ok(())
        })
        .await?;
    Ok(DraftBody::ok(snapshot))
}

/// DELETE /api/offer-drafts/{id}
///
/// Abandon the wizard. Nothing is sent anywhere.
pub async fn abandon_draft(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Path(id): Path<EntityId>,
) -> AppResult<Json<OkResponse<Empty>>> {
    let owner = caller.map(|c| c.identity.id);
    state.drafts.remove(id, owner).await?;
    tracing::info!(draft_id = %id, "Offer draft abandoned");
    Ok(Json(OkResponse::empty()))
}

/// POST /api/offer-drafts/{id}/next
///
/// Validate the current step and move forward. Flows gated before advance
/// answer 401 with a sign-in redirect for anonymous callers.
pub async fn next_step(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Path(id): Path<EntityId>,
) -> AppResult<Json<OkResponse<DraftBody>>> {
    let owner = caller.map(|c| c.identity.id);
    let mut redirect_to = None;

    let result = state
        .drafts
        .update(id, owner, |wizard| {
            redirect_to = Some(wizard.sign_in_redirect());
            wizard.advance(owner.is_some())
        })
        .await;

    match result {
        Ok((snapshot, step)) => {
            tracing::debug!(draft_id = %id, step = step.to_number(), "Offer draft advanced");
            Ok(DraftBody::ok(snapshot))
        }
        Err(CoreError::Unauthorized(message)) => Err(AppError::SignInRequired {
            message,
            redirect_to: redirect_to.unwrap_or_else(|| sign_in_path(None, None)),
        }),
        Err(other) => Err(other.into()),
    }
}

/// POST /api/offer-drafts/{id}/back
pub async fn previous_step(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Path(id): Path<EntityId>,
) -> AppResult<Json<OkResponse<DraftBody>>> {
    let owner = caller.map(|c| c.identity.id);
    let (snapshot, _) = state
        .drafts
        .update(id, owner, |wizard| Ok(wizard.back()))
        .await?;
    Ok(DraftBody::ok(snapshot))
}

/// POST /api/offer-drafts/{id}/images
///
/// Upload an inspiration image and put it first in the draft's list.
pub async fn add_image(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Path(id): Path<EntityId>,
    multipart: Multipart,
) -> AppResult<Json<OkResponse<DraftImageBody>>> {
    let owner = caller.as_ref().map(|c| c.identity.id);
    // Refuse before uploading anything.
    state.drafts.get(id, owner).await?;

    let object = super::uploads::read_image(&state, caller.as_ref(), multipart).await?;
    let url = state.storage.upload(caller.as_ref(), object).await?;

    let image = url.clone();
    let (snapshot, ()) = state
        .drafts
        .update(id, owner, move |wizard| {
            wizard.add_inspiration_image(image);
            Ok(())
        })
        .await?;

    tracing::info!(draft_id = %id, "Inspiration image added to draft");

    Ok(Json(OkResponse::new(DraftImageBody {
        url,
        draft: snapshot.into(),
    })))
}

/// POST /api/offer-drafts/{id}/submit
///
/// Re-validate every step, then insert exactly one offer. The draft is
/// discarded on success and kept on any failure so the couple can retry.
pub async fn submit_draft(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    Path(id): Path<EntityId>,
) -> AppResult<Json<OkResponse<PostedOffer>>> {
    let owner = caller.as_ref().map(|c| c.identity.id);
    let snapshot = state.drafts.get(id, owner).await?;

    let sign_in_required = |redirect_to: String| AppError::SignInRequired {
        message: SUBMIT_SIGN_IN_MESSAGE.to_string(),
        redirect_to,
    };

    let offer = match snapshot.wizard.submission(caller.is_some())? {
        SubmitReadiness::Ready(offer) => offer,
        SubmitReadiness::SignInRequired { redirect_to } => {
            return Err(sign_in_required(redirect_to));
        }
    };
    let caller = caller.ok_or_else(|| sign_in_required(snapshot.wizard.sign_in_redirect()))?;

    let submission = submit_offer(state.offers.as_ref(), &caller, offer).await?;

    if let Err(e) = state.drafts.remove(id, owner).await {
        tracing::debug!(draft_id = %id, error = %e, "Draft already gone after submit");
    }

    tracing::info!(
        draft_id = %id,
        offer_id = %submission.offer.id,
        couple_id = %caller.identity.id,
        "Offer draft submitted",
    );

    Ok(Json(OkResponse::new(PostedOffer {
        id: submission.offer.id,
        redirect_to: POSTED_REDIRECT,
        deduplicated: submission.deduplicated,
    })))
}
