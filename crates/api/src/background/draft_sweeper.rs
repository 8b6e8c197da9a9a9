//! Periodic removal of abandoned offer drafts.
//!
//! Drafts live only in memory; any draft left untouched for longer than
//! `DRAFT_TTL_MINS` is dropped on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::drafts::DraftStore;

/// How often the sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(drafts: Arc<DraftStore>, ttl_mins: i64, cancel: CancellationToken) {
    run_every(drafts, ttl_mins, SWEEP_INTERVAL, cancel).await;
}

/// [`run`] with an explicit interval.
pub async fn run_every(
    drafts: Arc<DraftStore>,
    ttl_mins: i64,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        ttl_mins,
        interval_secs = every.as_secs(),
        "Draft sweeper started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Draft sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = drafts.sweep_idle(ttl_mins).await;
                if removed > 0 {
                    tracing::info!(removed, "Draft sweeper: dropped idle drafts");
                } else {
                    tracing::debug!("Draft sweeper: nothing idle");
                }
            }
        }
    }
}
