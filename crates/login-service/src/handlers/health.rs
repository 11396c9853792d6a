//! Health check handlers.
//!
//! - `/health`: liveness, returns OK while the process runs
//! - `/ready`: readiness, checks the database and that a login backend was
//!   selected

use crate::controllers::backend_label;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub login_backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness check. Checks nothing.
///
/// A misconfigured login backend does not fail liveness.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check.
///
/// Returns 503 when the database is unreachable or no single login backend
/// is configured. Details go to the log, not the response.
#[tracing::instrument(skip_all, name = "login.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let login_backend = backend_label(state.controller.as_ref());

    if state.controller.backend().is_none() {
        tracing::warn!(target: "login.health", "Readiness check failed: login backend misconfigured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                login_backend,
                database: None,
                error: Some("Login backend misconfigured".to_string()),
            }),
        );
    }

    if let Err(e) = sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        tracing::warn!(target: "login.health", error = %e, "Readiness check failed: database error");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                login_backend,
                database: Some("unhealthy"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            login_backend,
            database: Some("healthy"),
            error: None,
        }),
    )
}
