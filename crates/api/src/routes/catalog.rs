use axum::{routing::get, Router};

use crate::handlers::catalog;
use crate::state::AppState;

/// `GET /catalog -> get_catalog`
pub fn router() -> Router<AppState> {
    Router::new().route("/catalog", get(catalog::get_catalog))
}
