use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use token_service::config::{Config, LogFormat};
use token_service::{api, expiration, AppState};

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
fn init_tracing(format: LogFormat) {
    let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Gcp => tracing_stackdriver::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Plain => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_format = LogFormat::from_env();
    init_tracing(log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        log_format = ?log_format,
        "token-service starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(environment = config.environment.name(), "Loaded configuration");

    // Open the record collections
    let state = Arc::new(AppState::open(config.clone()).await?);
    info!("Data directory opened at: {}", config.server.data_dir);

    // Start background tasks
    let expiration_handle = expiration::start_expiration_cleaner(Arc::clone(&state));
    if expiration_handle.is_none() {
        info!("No token cleanup interval configured, expired tokens are rejected lazily");
    }

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!(
        "Listening on: {} in {} mode",
        config.server.bind_address,
        config.environment.name()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup: abort background tasks
    info!("Shutting down background tasks");
    if let Some(handle) = expiration_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, draining connections");
}
