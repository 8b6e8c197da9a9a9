use axum::Json;
use wedflex_core::catalog::Catalog;

use crate::response::OkResponse;

/// GET /api/catalog
///
/// Service categories and cities an offer may be posted under.
pub async fn get_catalog() -> Json<OkResponse<Catalog>> {
    Json(OkResponse::new(Catalog::current()))
}
