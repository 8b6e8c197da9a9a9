//! Route definitions for server-held offer wizards.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::drafts;
use crate::state::AppState;

/// Routes mounted at `/offer-drafts`.
///
/// ```text
/// POST   /              -> create_draft
/// GET    /{id}          -> get_draft
/// PATCH  /{id}          -> update_draft
/// DELETE /{id}          -> abandon_draft
/// POST   /{id}/next     -> next_step
/// POST   /{id}/back     -> previous_step
/// POST   /{id}/images   -> add_image (multipart `file`)
/// POST   /{id}/submit   -> submit_draft
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(drafts::create_draft))
        .route(
            "/{id}",
            get(drafts::get_draft)
                .patch(drafts::update_draft)
                .delete(drafts::abandon_draft),
        )
        .route("/{id}/next", post(drafts::next_step))
        .route("/{id}/back", post(drafts::previous_step))
        .route("/{id}/images", post(drafts::add_image))
        .route("/{id}/submit", post(drafts::submit_draft))
}
