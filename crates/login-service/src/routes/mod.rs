//! HTTP routes for the login controller.
//!
//! Defines the Axum router and application state.

use crate::context::Cancellation;
use crate::controllers::LoginController;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Slack between the per-request deadline and the HTTP timeout layer, so a
/// slow backend fails with the controller's own deadline error first.
const TIMEOUT_LAYER_SLACK: Duration = Duration::from_secs(5);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. One transaction is opened per
    /// authentication request.
    pub pool: PgPool,

    /// The login backend chosen at startup.
    pub controller: Arc<dyn LoginController>,

    /// Deadline applied to each request context.
    pub request_timeout: Duration,

    /// Cancelled on shutdown. Every request context derives a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Cancellation for one request: a child of the shutdown token bounded
    /// by the request deadline.
    pub fn request_cancellation(&self) -> Cancellation {
        Cancellation::new(self.shutdown.child_token()).with_timeout(self.request_timeout)
    }
}

/// Build the application routes.
///
/// - `/login`, `/logout` - interactive login and logout
/// - `/arvados/v1/users/authenticate` - username/password authentication
/// - `/health` - liveness check
/// - `/ready` - readiness check (database + backend selection)
/// - `/metrics` - Prometheus metrics
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let http_timeout = state.request_timeout + TIMEOUT_LAYER_SLACK;

    let login_routes = Router::new()
        .route("/login", get(handlers::login))
        .route("/logout", get(handlers::logout))
        .route(
            "/arvados/v1/users/authenticate",
            post(handlers::user_authenticate),
        )
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees framework rejections too)
    login_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(http_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}
