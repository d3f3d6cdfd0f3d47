//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! This module provides:
//! - A `/metrics` endpoint that returns Prometheus-formatted metrics
//! - Middleware for tracking HTTP request counts and durations
//! - Helper functions to record predictions and authentication outcomes

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::classifier::Label;
use crate::AppState;

// Metric names as constants for consistency
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const PREDICTIONS_TOTAL: &str = "predictions_total";
pub const HISTORY_WRITE_FAILURES_TOTAL: &str = "history_write_failures_total";
pub const AUTH_ATTEMPTS_TOTAL: &str = "auth_attempts_total";

/// Initialize the Prometheus metrics recorder and return a handle for rendering metrics.
///
/// This should be called once during application startup.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(PREDICTIONS_TOTAL, "Total number of predictions by label");
    describe_counter!(
        HISTORY_WRITE_FAILURES_TOTAL,
        "Prediction history rows that could not be written"
    );
    describe_counter!(
        AUTH_ATTEMPTS_TOTAL,
        "Signup and login attempts by outcome"
    );

    Ok(handle)
}

/// GET /metrics - Returns Prometheus-formatted metrics.
///
/// This endpoint is accessible without authentication.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Middleware to track HTTP request metrics.
///
/// Records:
/// - `http_requests_total` counter with method, path, and status labels
/// - `http_request_duration_seconds` histogram with method and path labels
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

/// Record a served prediction.
pub fn record_prediction(label: Label) {
    counter!(PREDICTIONS_TOTAL, "label" => label.as_str()).increment(1);
}

/// Record a prediction whose history row was rolled back.
pub fn record_history_failure() {
    counter!(HISTORY_WRITE_FAILURES_TOTAL).increment(1);
}

/// Record a signup or login attempt.
pub fn record_auth_attempt(action: &'static str, outcome: &'static str) {
    counter!(AUTH_ATTEMPTS_TOTAL, "action" => action, "outcome" => outcome).increment(1);
}
