use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderwatch_core::{
    load_config, validate_config, HttpOrderSource, OrderSource, StatusChange,
    StatusUpdateCallback, Tracker,
};
use orderwatch_server::api::{create_router, WsBroadcaster};
use orderwatch_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("orderwatch {} starting", VERSION);

    // Determine config path
    let config_path = std::env::var("ORDERWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        "Polling every {}s, display offset {} minutes",
        config.tracker.poll_interval_secs, config.tracker.utc_offset_minutes
    );

    // Upstream order list
    let source: Arc<dyn OrderSource> = Arc::new(
        HttpOrderSource::new(&config.orders_api).context("Failed to create orders API client")?,
    );
    info!("Using order source: {}", source.name());

    // Create WebSocket broadcaster for real-time updates
    let ws_broadcaster = WsBroadcaster::default();

    // Push poll results to open tracking pages
    let broadcaster_for_callback = ws_broadcaster.clone();
    let update_callback: StatusUpdateCallback =
        Arc::new(move |session_id: &str, changes: &[StatusChange]| {
            broadcaster_for_callback.status_update(session_id, changes);
        });

    let tracker = Arc::new(
        Tracker::new(config.tracker.clone(), source).with_update_callback(update_callback),
    );
    tracker.start().await;
    info!("Status tracker started");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&tracker),
        ws_broadcaster,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping status tracker...");
    tracker.stop().await;
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
