pub mod auth;
pub mod catalog;
pub mod drafts;
pub mod health;
pub mod requests;
pub mod uploads;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /catalog                                 categories and cities (public)
///
/// /requests                                list own offers, post an offer
/// /requests/{id}                           one of the caller's offers
///
/// /auth/magic-link                         email a sign-in link (public)
/// /auth/callback                           exchange a callback URL (public)
/// /auth/me                                 current identity
/// /auth/refresh                            rotate a refresh token (public)
/// /auth/sign-out                           revoke sessions
///
/// /uploads/inspiration                     upload an inspiration image
///
/// /offer-drafts                            start a wizard
/// /offer-drafts/{id}                       get, patch, abandon
/// /offer-drafts/{id}/next                  validate and advance
/// /offer-drafts/{id}/back                  step back
/// /offer-drafts/{id}/images                add an inspiration image
/// /offer-drafts/{id}/submit                post the offer
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .nest("/requests", requests::router())
        .nest("/auth", auth::router())
        .nest("/uploads", uploads::router())
        .nest("/offer-drafts", drafts::router())
}
