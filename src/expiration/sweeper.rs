use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::AppState;

/// Start the background sweeper for pending token requests.
///
/// Ticks on a fixed period and expires every request whose deadline has
/// passed, which delivers the same denial-shaped response the requester
/// would get from an explicit deny.
pub fn start_request_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.auth.sweep_interval_seconds);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;

            let expired = state.auth.sweep_expired_requests();
            if expired > 0 {
                debug!(expired, "Expired pending token requests");
            }
        }
    })
}
