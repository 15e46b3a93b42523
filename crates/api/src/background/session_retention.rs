//! Periodic eviction of finished sessions.
//!
//! Only started when `SESSION_TTL_SECS` is set. Running sessions are never
//! evicted, however old.

use std::sync::Arc;
use std::time::Duration;

use banner_core::store::SessionStore;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// Upper bound on how often the sweep runs.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Sweep interval for a given TTL: a tenth of it, clamped to 1s..=60s.
pub fn sweep_interval(ttl: Duration) -> Duration {
    (ttl / 10).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL)
}

/// Run the retention loop until `cancel` is triggered.
///
/// Removes sessions that finished more than `ttl` ago.
pub async fn run(store: Arc<SessionStore>, ttl: Duration, cancel: CancellationToken) {
    let every = sweep_interval(ttl);
    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = every.as_secs(),
        "Session retention job started"
    );

    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        tracing::warn!("Session TTL out of range, retention disabled");
        return;
    };

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let purged = store.purge_finished_before(Utc::now() - ttl);
                if purged > 0 {
                    tracing::info!(
                        purged,
                        remaining = store.len(),
                        "Session retention: evicted finished sessions"
                    );
                } else {
                    tracing::debug!("Session retention: nothing to evict");
                }
            }
        }
    }
}
