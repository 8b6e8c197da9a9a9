use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// `memory`, `postgres` or `hosted`.
    pub backend: &'static str,
    /// Whether the offer store is reachable.
    pub store_healthy: bool,
}

/// GET /health -- returns service and offer-store health.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_healthy = match state.offers.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Offer store health check failed");
            false
        }
    };

    let status = if store_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        ok: true,
        status,
        version: env!("CARGO_PKG_VERSION"),
        backend: state.config.backend.mode(),
        store_healthy,
    })
}
