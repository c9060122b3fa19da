//! Request metrics in Prometheus text and JSON form

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info_span, Instrument};

pub struct Metrics {
    pub http_requests_total: AtomicU64,
    pub http_requests_2xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    /// Requests rejected by the rate limiter
    pub http_requests_throttled: AtomicU64,
    pub http_request_duration_ms_total: AtomicU64,
    pub active_requests: AtomicU64,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_requests_throttled: AtomicU64::new(0),
            http_request_duration_ms_total: AtomicU64::new(0),
            active_requests: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self, status: StatusCode, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_ms_total
            .fetch_add(duration_ms, Ordering::Relaxed);

        let code = status.as_u16();
        if (200..300).contains(&code) {
            self.http_requests_2xx.fetch_add(1, Ordering::Relaxed);
        } else if (400..500).contains(&code) {
            self.http_requests_4xx.fetch_add(1, Ordering::Relaxed);
        } else if code >= 500 {
            self.http_requests_5xx.fetch_add(1, Ordering::Relaxed);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.http_requests_throttled.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn export_prometheus(&self) -> String {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let mut output = String::new();

        let mut metric = |name: &str, kind: &str, help: &str, samples: &[(&str, u64)]| {
            let _ = writeln!(output, "# HELP {name} {help}");
            let _ = writeln!(output, "# TYPE {name} {kind}");
            for (labels, value) in samples {
                let _ = writeln!(output, "{name}{labels} {value}");
            }
        };

        metric(
            "http_requests_total",
            "counter",
            "Total number of HTTP requests",
            &[("", load(&self.http_requests_total))],
        );
        metric(
            "http_requests_by_status",
            "counter",
            "HTTP requests by status code range",
            &[
                ("{status=\"2xx\"}", load(&self.http_requests_2xx)),
                ("{status=\"4xx\"}", load(&self.http_requests_4xx)),
                ("{status=\"5xx\"}", load(&self.http_requests_5xx)),
            ],
        );
        metric(
            "http_requests_throttled_total",
            "counter",
            "Requests rejected by the rate limiter",
            &[("", load(&self.http_requests_throttled))],
        );
        metric(
            "http_request_duration_ms_total",
            "counter",
            "Total HTTP request duration in milliseconds",
            &[("", load(&self.http_request_duration_ms_total))],
        );
        metric(
            "http_requests_in_flight",
            "gauge",
            "Requests currently being served",
            &[("", load(&self.active_requests))],
        );
        metric(
            "uptime_seconds",
            "gauge",
            "Server uptime in seconds",
            &[("", self.uptime_seconds())],
        );

        output
    }

    pub fn export_json(&self) -> serde_json::Value {
        serde_json::json!({
            "http": {
                "requestsTotal": self.http_requests_total.load(Ordering::Relaxed),
                "requests2xx": self.http_requests_2xx.load(Ordering::Relaxed),
                "requests4xx": self.http_requests_4xx.load(Ordering::Relaxed),
                "requests5xx": self.http_requests_5xx.load(Ordering::Relaxed),
                "requestsThrottled": self.http_requests_throttled.load(Ordering::Relaxed),
                "requestDurationMsTotal": self.http_request_duration_ms_total.load(Ordering::Relaxed),
                "inFlight": self.active_requests.load(Ordering::Relaxed),
            },
            "uptimeSeconds": self.uptime_seconds(),
        })
    }
}

pub async fn metrics_middleware(
    State(metrics): State<Arc<Metrics>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    metrics.active_requests.fetch_add(1, Ordering::Relaxed);

    let response = next
        .run(request)
        .instrument(info_span!("http_request", %method, %uri))
        .await;

    let duration = start.elapsed();
    let status = response.status();

    debug!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    metrics.record_request(status, duration.as_millis() as u64);
    metrics.active_requests.fetch_sub(1, Ordering::Relaxed);

    response
}

/// GET /metrics
pub async fn prometheus_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.export_prometheus()
}

/// GET /metrics.json
pub async fn json_metrics(State(metrics): State<Arc<Metrics>>) -> axum::Json<serde_json::Value> {
    axum::Json(metrics.export_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new();

        metrics.record_request(StatusCode::OK, 50);
        metrics.record_request(StatusCode::NOT_FOUND, 10);
        metrics.record_request(StatusCode::INTERNAL_SERVER_ERROR, 100);

        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.http_requests_2xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_5xx.load(Ordering::Relaxed), 1);
        assert_eq!(
            metrics.http_request_duration_ms_total.load(Ordering::Relaxed),
            160
        );
    }

    #[test]
    fn test_throttled_requests_counted_separately() {
        let metrics = Metrics::new();
        metrics.record_request(StatusCode::TOO_MANY_REQUESTS, 1);
        metrics.record_request(StatusCode::UNAUTHORIZED, 1);

        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.http_requests_throttled.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_request(StatusCode::OK, 50);

        let output = metrics.export_prometheus();
        assert!(output.contains("# TYPE http_requests_total counter"));
        assert!(output.contains("http_requests_total 1\n"));
        assert!(output.contains("http_requests_by_status{status=\"2xx\"} 1"));
        assert!(output.contains("uptime_seconds"));
    }

    #[test]
    fn test_json_export() {
        let metrics = Metrics::new();
        metrics.record_request(StatusCode::CREATED, 5);

        let json = metrics.export_json();
        assert_eq!(json["http"]["requestsTotal"], 1);
        assert_eq!(json["http"]["requests2xx"], 1);
        assert_eq!(json["http"]["inFlight"], 0);
    }
}
