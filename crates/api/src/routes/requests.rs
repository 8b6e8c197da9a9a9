//! Route definitions for the `/requests` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::requests;
use crate::state::AppState;

/// Routes mounted at `/requests`.
///
/// ```text
/// GET  /       -> list_requests (requires auth)
/// POST /       -> create_request (requires auth)
/// GET  /{id}   -> get_request (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/{id}", get(requests::get_request))
}
