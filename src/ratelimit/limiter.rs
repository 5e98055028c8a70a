use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_MAX_REQUESTS: usize = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: usize },
    /// Seconds until the oldest request in the window leaves it.
    Rejected { retry_after: u64 },
}

#[cfg(test)]
impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Sliding-window request counter keyed by client id.
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Drop timestamps older than the window, then record this attempt if
    /// the client is still under the limit.
    pub async fn admit(&self, client_id: &str) -> Admission {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let history = clients.entry(client_id.to_string()).or_default();

        prune(history, now, self.window);

        if history.len() >= self.max_requests {
            let retry_after = history
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window)
                .as_secs_f64()
                .ceil() as u64;
            let retry_after = retry_after.max(1);
            return Admission::Rejected { retry_after };
        }

        history.push_back(now);
        Admission::Allowed {
            remaining: self.max_requests - history.len(),
        }
    }

    /// Forget clients with no requests inside the window. Returns how many
    /// were removed.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, history| {
            prune(history, now, self.window);
            !history.is_empty()
        });
        before - clients.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

fn prune(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = history.front() {
        if now.duration_since(oldest) < window {
            break;
        }
        history.pop_front();
    }
}
