//! Metrics definitions for the login controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `login_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `backend`: 8 values (google, openid_connect, sso, pam, ldap, test,
//!   login_cluster, misconfigured)
//! - `operation`: 3 values (login, logout, user_authenticate)
//! - `status`: success or one of the [`ErrorCategory`](super::ErrorCategory) labels
//! - `path`: fixed route templates, everything else collapses to `/other`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its render handle.
///
/// Fails if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Controller operations include a remote session-create round trip
        .set_buckets_for_metric(
            Matcher::Prefix("login_operation".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set operation buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("login_token_mint".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set token mint buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("login_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Backend Selection Metrics
// ============================================================================

/// Record which backend the selector produced.
///
/// Metric: `login_backend_selections_total`
/// Labels: `backend`
pub fn record_backend_selection(backend: &str) {
    counter!("login_backend_selections_total", "backend" => backend.to_string()).increment(1);
}

// ============================================================================
// Controller Operation Metrics
// ============================================================================

/// Record a login controller operation.
///
/// Metric: `login_operations_total`, `login_operation_duration_seconds`
/// Labels: `backend`, `operation`, `status`
pub fn record_operation(backend: &str, operation: &str, status: &str, duration: Duration) {
    histogram!("login_operation_duration_seconds",
        "backend" => backend.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("login_operations_total",
        "backend" => backend.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Token Minting Metrics
// ============================================================================

/// Record a token minting attempt.
///
/// Metric: `login_token_mint_total`, `login_token_mint_duration_seconds`
/// Labels: `status`
pub fn record_token_mint(status: &str, duration: Duration) {
    histogram!("login_token_mint_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("login_token_mint_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `login_http_requests_total`, `login_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("login_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path.to_string(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("login_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn normalize_path(path: &str) -> &'static str {
    match path {
        "/login" => "/login",
        "/logout" => "/logout",
        "/arvados/v1/users/authenticate" => "/arvados/v1/users/authenticate",
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}
