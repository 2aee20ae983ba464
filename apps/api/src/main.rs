mod config;
mod errors;
mod executor;
mod generation;
mod llm_client;
mod rate_limit;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::ProviderHandle;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;

/// How often expired rate-limit windows are swept out of memory.
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CoverForge API v{}", env!("CARGO_PKG_VERSION"));

    if config.api_key.is_none() {
        warn!("X_API_KEY is not set; /generate/all is open to unauthenticated callers");
    }
    if config.allowed_origins.is_empty() {
        warn!("ALLOWED_ORIGINS is empty; cross-origin requests will be refused");
    }

    // The Gemini client itself is built on first use
    let provider = ProviderHandle::gemini(config.gemini_api_key.clone());

    let state = AppState::new(config.clone(), provider);
    info!(
        "Rate limit tiers: {}",
        state
            .limiter
            .tiers()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!(
        "Provider deadline {}s, {} workers",
        config.provider_timeout.as_secs(),
        config.provider_pool_size
    );

    let sweeper = state.limiter.spawn_sweeper(RATE_LIMIT_SWEEP_INTERVAL);

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config)),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    info!("Shut down cleanly");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
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
                warn!("Failed to listen for SIGTERM: {e}");
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

    info!("Shutdown signal received");
}
