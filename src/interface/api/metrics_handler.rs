//! Prometheus metrics handler

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics exporter
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()?;

    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "calls_initiated_total",
        "Total number of calls accepted by the voice platform"
    );
    describe_counter!(
        "calls_dispatch_failed_total",
        "Total number of calls the voice platform refused or never received"
    );
    describe_counter!(
        "webhooks_received_total",
        "Total number of voice platform webhooks, by outcome"
    );
    describe_counter!(
        "call_syncs_total",
        "Total number of calls refreshed from the voice platform, by outcome"
    );

    Ok(handle)
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    let metrics = prometheus_handle.render();
    (StatusCode::OK, metrics).into_response()
}

/// Middleware recording request count and latency per route
pub async fn track_http_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());
    response
}

/// Record HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: std::time::Duration) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_call_initiated() {
    counter!("calls_initiated_total").increment(1);
}

pub fn record_dispatch_failed() {
    counter!("calls_dispatch_failed_total").increment(1);
}

/// Record a webhook by what became of it
pub fn record_webhook(outcome: &'static str) {
    counter!("webhooks_received_total", "outcome" => outcome).increment(1);
}

pub fn record_call_sync(synced: bool) {
    let outcome = if synced { "synced" } else { "skipped" };
    counter!("call_syncs_total", "outcome" => outcome).increment(1);
}
