//! Handlers for the `/auth` resource: magic-link sign-in, session refresh
//! and sign-out.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;
use wedflex_core::identity::{canonical_email, Identity, Session};
use wedflex_core::magic_link::{
    callback_url, failure_redirect, plan_callback, sign_in_path, CallbackPlan,
};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{CurrentIdentity, MaybeIdentity};
use crate::response::{Empty, OkResponse};
use crate::services::identity::IdentityError;
use crate::state::AppState;

const LINK_SENT: &str = "Check your email for a sign-in link.";
const MISSING_CODE: &str = "This sign-in link is incomplete. Please request a new one.";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/magic-link`.
#[derive(Debug, Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    /// Where to land after signing in; only relative paths are honoured.
    #[serde(default)]
    pub next: Option<String>,
}

/// Request body for `POST /auth/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// The full URL the emailed link opened, fragment included.
    pub url: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LinkSent {
    pub message: &'static str,
}

/// Outcome of a callback. Failures are not HTTP errors: the client is
/// always told where to go next.
#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub ok: bool,
    pub redirect_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallbackResponse {
    fn signed_in(plan: CallbackPlan, session: Option<Session>) -> Self {
        Self {
            ok: true,
            redirect_to: plan.next,
            session,
            error: None,
        }
    }

    fn failed(message: String, redirect_to: String) -> Self {
        Self {
            ok: false,
            redirect_to,
            session: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub session: Session,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: Identity,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/magic-link
///
/// Email a one-time link that returns to `/auth/callback`, carrying `next`.
pub async fn send_magic_link(
    State(state): State<AppState>,
    Json(input): Json<MagicLinkRequest>,
) -> AppResult<Json<OkResponse<LinkSent>>> {
    input.validate().map_err(|e| {
        let message = e
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid sign-in request".to_string());
        AppError::BadRequest(message)
    })?;

    let redirect_to = callback_url(&state.config.public_origin, input.next.as_deref())?;
    state
        .identity
        .send_magic_link(&canonical_email(&input.email), &redirect_to)
        .await?;

    tracing::info!(next = ?input.next, "Magic link requested");

    Ok(Json(OkResponse::new(LinkSent { message: LINK_SENT })))
}

/// POST /api/auth/callback
///
/// Exchange the fragment or code in a callback URL for a session. A caller
/// that is already signed in is sent straight on without exchanging.
pub async fn callback(
    State(state): State<AppState>,
    MaybeIdentity(existing): MaybeIdentity,
    Json(input): Json<CallbackRequest>,
) -> AppResult<Json<CallbackResponse>> {
    let url = Url::parse(&input.url)
        .or_else(|_| state.config.public_origin.join(&input.url))
        .map_err(|e| AppError::BadRequest(format!("Invalid callback URL: {e}")))?;
    let plan = plan_callback(&url);

    if let Some(existing) = existing {
        tracing::debug!(user_id = %existing.identity.id, "Callback with live session; skipping exchange");
        return Ok(Json(CallbackResponse::signed_in(plan, None)));
    }

    let Some(exchange) = plan.exchange.clone() else {
        return Ok(Json(CallbackResponse::failed(
            MISSING_CODE.to_string(),
            sign_in_path(None, None),
        )));
    };

    match state.identity.exchange(&exchange).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, next = %plan.next, "Signed in via magic link");
            Ok(Json(CallbackResponse::signed_in(plan, Some(session))))
        }
        Err(IdentityError::Rejected(message) | IdentityError::Upstream(message)) => {
            tracing::info!(error = %message, "Magic link exchange failed");
            let redirect_to = failure_redirect(Some(&message));
            Ok(Json(CallbackResponse::failed(message, redirect_to)))
        }
        Err(other) => {
            tracing::error!(error = %other, "Magic link exchange errored");
            let redirect_to = failure_redirect(None);
            Ok(Json(CallbackResponse::failed(
                "Sign-in failed".to_string(),
                redirect_to,
            )))
        }
    }
}

/// GET /api/auth/me
pub async fn me(caller: CurrentIdentity) -> Json<OkResponse<UserBody>> {
    Json(OkResponse::new(UserBody {
        user: caller.identity,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<OkResponse<SessionBody>>> {
    let session = state.identity.refresh(&input.refresh_token).await?;
    tracing::info!(user_id = %session.user.id, "Session refreshed");
    Ok(Json(OkResponse::new(SessionBody { session })))
}

/// POST /api/auth/sign-out
///
/// Revokes server-side sessions. Access tokens already issued stay valid
/// until they expire.
pub async fn sign_out(
    caller: CurrentIdentity,
    State(state): State<AppState>,
) -> AppResult<Json<OkResponse<Empty>>> {
    state.identity.sign_out(&caller).await?;
    tracing::info!(user_id = %caller.identity.id, "Signed out");
    Ok(Json(OkResponse::empty()))
}
