use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::ForecastResponse;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache key for a region and horizon. Region case and surrounding
/// whitespace do not matter.
pub fn cache_key(region: &str, months_ahead: u32) -> String {
    format!("{}_{}", region.trim().to_lowercase(), months_ahead)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    cached_at: Instant,
    response: ForecastResponse,
}

/// In-memory forecast cache shared by all requests.
/// Entries expire `ttl` after they were stored; expiry is checked on read.
#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<ForecastResponse> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.cached_at.elapsed() < self.ttl)
            .map(|e| e.response.clone())
    }

    /// Store a response, replacing whatever the key held before.
    pub async fn put(&self, key: String, response: ForecastResponse) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                cached_at: Instant::now(),
                response,
            },
        );
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.cached_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
