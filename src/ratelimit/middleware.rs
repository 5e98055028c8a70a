use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Instant;

use super::limiter::{Admission, RateLimiter};
use crate::errors::AppError;

#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: RateLimiter,
    pub enabled: bool,
    /// Only set behind a proxy that overwrites the forwarding headers.
    pub trust_forwarded_headers: bool,
}

/// Client identity for rate limiting: the peer address, or with
/// `trust_forwarded` the first `x-forwarded-for` hop, then `x-real-ip`,
/// then the peer address.
pub fn client_id(req: &Request, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(forwarded) = forwarded_client(req) {
            return forwarded;
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into())
}

fn forwarded_client(req: &Request) -> Option<String> {
    let headers = req.headers();

    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(first.to_string());
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(real_ip.to_string());
    }

    None
}

/// Admission control plus request logging for every route.
/// Rejected requests get 429 with `retry-after`; admitted ones carry
/// `x-process-time` (seconds) and, when limiting is on, the remaining quota.
pub async fn request_guard(
    State(state): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let client = client_id(&req, state.trust_forwarded_headers);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let remaining = if state.enabled {
        match state.limiter.admit(&client).await {
            Admission::Allowed { remaining } => Some(remaining),
            Admission::Rejected { retry_after } => {
                tracing::warn!(client = %client, path = %path, retry_after, "Rate limit exceeded");
                let mut response =
                    AppError::too_many_requests("Rate limit exceeded. Please try again later.").into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                return response;
            }
        }
    } else {
        None
    };

    let mut response = next.run(req).await;

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_secs = elapsed,
        client = %client,
        "Request handled"
    );
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.6}")) {
        response.headers_mut().insert("x-process-time", value);
    }
    if let Some(remaining) = remaining {
        let headers = response.headers_mut();
        headers.insert("x-ratelimit-limit", HeaderValue::from(state.limiter.max_requests()));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(limit: usize, enabled: bool, trust_forwarded_headers: bool) -> Router {
        let state = RateLimitState {
            limiter: RateLimiter::new(limit, Duration::from_secs(60)),
            enabled,
            trust_forwarded_headers,
        };
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state, request_guard))
    }

    fn request_from(peer: [u8; 4], forwarded_for: &str) -> Request<Body> {
        let mut req = Request::builder()
            .uri("/")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        req
    }

    #[test]
    fn test_client_id_sources() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_id(&req, true), "203.0.113.7");

        let req = Request::builder()
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_id(&req, true), "198.51.100.2");

        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_id(&req, true), "192.0.2.1");

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_id(&req, true), "unknown");
    }

    #[test]
    fn test_forwarded_headers_ignored_by_default() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_id(&req, false), "192.0.2.1");

        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_id(&req, false), "unknown");
    }

    #[tokio::test]
    async fn test_rejects_over_limit() {
        let app = app(2, true, false);

        for _ in 0..2 {
            let response = app.clone().oneshot(request_from([1, 1, 1, 1], "9.9.9.9")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("x-process-time"));
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        }

        let response = app.clone().oneshot(request_from([1, 1, 1, 1], "9.9.9.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "RATE_LIMITED");

        let other = app.oneshot(request_from([2, 2, 2, 2], "9.9.9.9")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_still_limited() {
        let app = app(2, true, false);
        let mut statuses = Vec::new();
        for i in 0..50u8 {
            let spoofed = format!("10.0.0.{i}");
            let response = app.clone().oneshot(request_from([1, 1, 1, 1], &spoofed)).await.unwrap();
            statuses.push(response.status());
        }

        let admitted = statuses.iter().filter(|s| **s == StatusCode::OK).count();
        assert_eq!(admitted, 2);
        assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_trusted_proxy_limits_per_forwarded_client() {
        let app = app(1, true, true);
        let first = app.clone().oneshot(request_from([1, 1, 1, 1], "10.0.0.1")).await.unwrap();
        let second = app.clone().oneshot(request_from([1, 1, 1, 1], "10.0.0.2")).await.unwrap();
        let repeat = app.oneshot(request_from([1, 1, 1, 1], "10.0.0.1")).await.unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_disabled_limiter_admits_everything() {
        let app = app(1, false, false);
        for _ in 0..5 {
            let response = app.clone().oneshot(request_from([1, 1, 1, 1], "9.9.9.9")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(!response.headers().contains_key("x-ratelimit-remaining"));
        }
    }
}
