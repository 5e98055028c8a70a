use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::ratelimit::RateLimiter;

/// Periodically purge expired cache entries and forget idle rate-limit
/// clients, so neither map grows for the life of the process.
pub fn spawn_maintenance(cache: ResponseCache, limiter: RateLimiter, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_maintenance(&cache, &limiter).await;
        }
    })
}

async fn run_maintenance(cache: &ResponseCache, limiter: &RateLimiter) {
    let purged = cache.purge_expired().await;
    let evicted = limiter.evict_idle().await;
    let cache_entries = cache.len().await;
    let clients = limiter.tracked_clients().await;
    if purged > 0 || evicted > 0 {
        info!(purged, evicted, cache_entries, clients, "Maintenance removed stale state");
    } else {
        debug!(cache_entries, clients, "Maintenance found nothing to remove");
    }
}
