//! Runtime lifecycle: bind the control plane, serve, and shut down.

use std::net::SocketAddr;

use anyhow::{Context, Result};

use crate::common::AppConfig;
use crate::server::routes;
use crate::server::state::AppState;

/// Creates the staging directory, binds the control port, and serves until
/// a shutdown signal arrives.
pub async fn run(config: AppConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("create upload dir {}", config.upload_dir.display()))?;

    let port = config.port;
    let state = AppState::new(config);
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind control port {port}"))?;

    tracing::info!(port, "server started");

    // Client addresses feed the rate limiter and each offer's dial-back host.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serve control plane")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
