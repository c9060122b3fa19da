//! Request middleware

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tb_auth::{RateLimitDecision, RateLimiter};

use crate::error::ApiError;

/// State of one rate-limit layer
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<RateLimiter>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimitState {
    pub fn new(limiter: Arc<RateLimiter>, trusted_proxies: Arc<[IpAddr]>) -> Self {
        Self {
            limiter,
            trusted_proxies,
        }
    }
}

/// Count the request against the caller's window; 429 once it is used up
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let limiter = &state.limiter;
    let key = client_key(&request, &state.trusted_proxies);

    match limiter.check(&key) {
        RateLimitDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limiter.max_requests()));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        RateLimitDecision::Limited { retry_after } => {
            tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            let retry_after_seconds = retry_after.as_secs().max(1);
            let mut response = ApiError::RateLimited {
                retry_after_seconds,
            }
            .into_response();
            response
                .headers_mut()
                .insert("x-ratelimit-limit", HeaderValue::from(limiter.max_requests()));
            response
        }
    }
}

/// The socket peer, unless it is a trusted proxy: then the right-most
/// `X-Forwarded-For` hop that is not itself a trusted proxy
fn client_key(request: &Request, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return "unknown".to_string();
    };

    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let forwarded = request
        .headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect::<Vec<_>>();

    forwarded
        .iter()
        .rev()
        .map(|hop| hop.parse::<IpAddr>())
        .take_while(Result::is_ok)
        .flatten()
        .find(|ip| !trusted_proxies.contains(ip))
        .unwrap_or(peer)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    const PROXY: &str = "10.0.0.1";

    fn app(limiter: Arc<RateLimiter>, trusted: &[&str]) -> Router {
        let trusted: Arc<[IpAddr]> = trusted.iter().map(|ip| ip.parse().unwrap()).collect();
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                RateLimitState::new(limiter, trusted),
                rate_limit,
            ))
    }

    fn request(peer: &str, forwarded_for: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded_for);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let addr = SocketAddr::new(peer.parse().unwrap(), 40000);
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test]
    async fn test_allows_until_limit_then_429() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));

        let first = app(limiter.clone(), &[]).oneshot(request("203.0.113.7", None)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-ratelimit-remaining"], "1");

        let second = app(limiter.clone(), &[]).oneshot(request("203.0.113.7", None)).await.unwrap();
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");

        let third = app(limiter.clone(), &[]).oneshot(request("203.0.113.7", None)).await.unwrap();
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(third.headers().contains_key("retry-after"));
        assert_eq!(third.headers()["x-ratelimit-remaining"], "0");

        // other clients keep their own window
        let other = app(limiter, &[]).oneshot(request("203.0.113.8", None)).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forwarded_for_from_untrusted_peer_is_ignored() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));

        let mut allowed = 0;
        for i in 0..20 {
            let spoofed = format!("198.51.100.{i}");
            let response = app(limiter.clone(), &[])
                .oneshot(request("203.0.113.7", Some(&spoofed)))
                .await
                .unwrap();
            if response.status() == StatusCode::OK {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 2);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_client_key_uses_peer_by_default() {
        let spoofed = request("203.0.113.7", Some("198.51.100.1"));
        assert_eq!(client_key(&spoofed, &[]), "203.0.113.7");

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&bare, &[]), "unknown");
    }

    #[test]
    fn test_client_key_behind_trusted_proxy_takes_rightmost_untrusted_hop() {
        let trusted: Vec<IpAddr> = vec![PROXY.parse().unwrap(), "10.0.0.2".parse().unwrap()];

        // the client forged the first entry; the proxy appended the real address
        let forwarded = request(PROXY, Some("198.51.100.1, 203.0.113.7, 10.0.0.2"));
        assert_eq!(client_key(&forwarded, &trusted), "203.0.113.7");

        let direct = request(PROXY, None);
        assert_eq!(client_key(&direct, &trusted), PROXY);

        let garbage = request(PROXY, Some("not-an-ip"));
        assert_eq!(client_key(&garbage, &trusted), PROXY);
    }
}
