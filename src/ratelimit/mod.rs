pub mod limiter;
pub mod middleware;

pub use limiter::RateLimiter;
pub use middleware::{request_guard, RateLimitState};
