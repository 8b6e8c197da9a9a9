use axum::routing::post;
use axum::Router;

use crate::handlers::uploads;
use crate::state::AppState;

/// Routes mounted at `/uploads`.
///
/// ```text
/// POST /inspiration -> upload_inspiration (multipart `file`)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/inspiration", post(uploads::upload_inspiration))
}
