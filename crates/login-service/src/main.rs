//! Login Controller
//!
//! Serves interactive login, logout and username/password authentication
//! for one cluster, backed by the single login backend enabled in
//! configuration.

use login_service::clients::api_server::ApiServerClient;
use login_service::clients::UnavailableVerifier;
use login_service::config::Config;
use login_service::controllers::{choose_login_controller, LoginControllerDeps};
use login_service::observability::metrics::init_metrics_recorder;
use login_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_service=debug,login=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Login Controller");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        cluster_id = %config.cluster.cluster_id,
        bind_address = %config.bind_address,
        request_timeout_seconds = config.request_timeout_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Initialize database connection pool
    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    info!("Database connection established");

    let api_server = Arc::new(ApiServerClient::new(config.cluster.api_server_url.clone())?);
    let deps = LoginControllerDeps {
        identity_proxy: api_server.clone(),
        sessions: api_server,
        password_verifier: Arc::new(UnavailableVerifier),
        oidc_provider: None,
    };

    // A misconfigured backend is not fatal: health checks keep working and
    // every login operation reports the configuration problem.
    let controller = choose_login_controller(&config.cluster, &deps);

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        pool: db_pool,
        controller,
        request_timeout: Duration::from_secs(config.request_timeout_seconds),
        shutdown: shutdown.clone(),
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Login Controller listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // In-flight request contexts observe this and abort remote calls.
            shutdown.cancel();
        })
        .await?;

    info!("Login Controller shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
