//! mwrt-server - MammalWeb Rule of Thumb v0 analysis service
//!
//! Reconciles human and AI species classifications for camera-trap
//! sequences and forwards the agreed species to the MammalWeb API.
//!
//! Configuration comes from the environment (optionally backed by a TOML
//! file) and is validated before the listener is bound.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mwrt_common::config::ServiceConfig;
use mwrt_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mwrt-server
#[derive(Parser, Debug)]
#[command(name = "mwrt-server")]
#[command(about = "MammalWeb Rule of Thumb v0 analysis service")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "MWRT_BIND")]
    bind: SocketAddr,

    /// Optional TOML config file; environment variables take priority
    #[arg(short, long, env = "MWRT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mwrt_server=info,mwrt_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting MammalWeb Rule of Thumb (mwrt-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    // Refuse to start on any configuration problem
    let config = match ServiceConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e).context("Invalid configuration");
        }
    };
    info!(
        "Sentinels: unclassified={} nothing={} no_agreement={}",
        config.sentinels.unclassified, config.sentinels.nothing, config.sentinels.no_agreement
    );
    info!("Forwarding to {}", config.analysis_url());
    info!("Token endpoint: {} (client {})", config.auth.cognito_endpoint, config.auth.client_id);

    let state = AppState::new(&config).context("Failed to build HTTP client")?;

    // Failure is logged inside refresh; forwarding retries the exchange
    if state.tokens.refresh().await.is_err() {
        warn!("Starting without a MammalWeb API token");
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .context("Failed to bind to address")?;
    info!("mwrt-server listening on http://{}", args.bind);
    info!("Endpoint: POST http://{}/rule-of-thumb-v0", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires, so the
/// server keeps running until the other signal arrives.
async fn shutdown_signal() {
    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                error!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    info!("Received {}, draining in-flight requests", received);
}
