//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /magic-link  -> send_magic_link
/// POST /callback    -> callback
/// GET  /me          -> me (requires auth)
/// POST /refresh     -> refresh
/// POST /sign-out    -> sign_out (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/magic-link", post(auth::send_magic_link))
        .route("/callback", post(auth::callback))
        .route("/me", get(auth::me))
        .route("/refresh", post(auth::refresh))
        .route("/sign-out", post(auth::sign_out))
}
