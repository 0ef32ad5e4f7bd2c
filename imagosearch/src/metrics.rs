//! Prometheus metrics for the search API
//!
//! Recorded through the `metrics` facade; the server installs the Prometheus
//! recorder and renders it at `GET /metrics`. Without a recorder these calls
//! are no-ops.

use std::time::{Duration, Instant};

/// Record a finished request to one of the search endpoints
pub fn record_request(endpoint: &'static str, status: &'static str, duration: Duration) {
    metrics::counter!(
        "imago_search_requests_total",
        "endpoint" => endpoint,
        "status" => status,
    )
    .increment(1);

    metrics::histogram!(
        "imago_search_duration_seconds",
        "endpoint" => endpoint,
    )
    .record(duration.as_secs_f64());
}

/// Record a failed engine call
pub fn record_engine_error(operation: &'static str, error_type: &'static str) {
    metrics::counter!(
        "imago_engine_errors_total",
        "operation" => operation,
        "error_type" => error_type,
    )
    .increment(1);
}

/// Record a rejected search request, once per offending field
pub fn record_validation_failure<'a>(fields: impl Iterator<Item = &'a str>) {
    for field in fields {
        metrics::counter!(
            "imago_validation_failures_total",
            "field" => field.to_string(),
        )
        .increment(1);
    }
}

/// Times a request and records it on completion
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn start(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }

    pub fn finish(self, status: &'static str) {
        record_request(self.endpoint, status, self.start.elapsed());
    }
}
