//! Ephemeral one-shot transfer listener.
//!
//! Serves exactly one file to exactly one peer on the offer's port, then
//! exits. Wire format: one ASCII line `Filename: <name>\n`, then the raw
//! file bytes; closing the connection signals end-of-file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::transfer::registry::OfferRegistry;
use crate::utils::security;

/// Bounded wait for a downloader to connect.
pub const ACCEPT_TIMEOUT: Duration = Duration::from_secs(50);
/// Per-connection deadline for the whole send.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(30);

const SEND_CHUNK_SIZE: usize = 4096;

/// Runs one accept-and-send cycle for the offer registered on `port`.
///
/// Nothing is retried: accept timeouts and send failures are logged and the
/// task exits. The offer is deliberately NOT cleaned up here — an abandoned
/// listener leaves the offer orphaned in the registry, matching the
/// documented lifecycle.
pub async fn serve_offer(registry: Arc<OfferRegistry>, port: u16) {
    let Some(file_path) = registry.path_of(port) else {
        tracing::warn!(port, "no offer registered for port");
        return;
    };

    if let Err(err) = serve_once(port, &file_path).await {
        tracing::error!(port, error = %err, "transfer listener exited with error");
    }
}

async fn serve_once(port: u16, file_path: &Path) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .context("bind transfer port")?;

    let display_name = security::display_file_name(file_path);
    tracing::info!(port, file = %display_name, "serving file");

    let (stream, peer) = timeout(ACCEPT_TIMEOUT, listener.accept())
        .await
        .context("timed out waiting for a downloader")?
        .context("accept transfer connection")?;
    tracing::info!(%peer, "downloader connected");

    timeout(SEND_TIMEOUT, send_file(stream, file_path, &display_name))
        .await
        .context("transfer deadline exceeded")??;

    tracing::info!(port, file = %display_name, "file sent");
    Ok(())
}

async fn send_file(mut stream: TcpStream, file_path: &Path, display_name: &str) -> Result<()> {
    let mut file = tokio::fs::File::open(file_path)
        .await
        .context("open staged file")?;

    stream
        .write_all(format!("Filename: {display_name}\n").as_bytes())
        .await
        .context("write transfer header")?;

    let mut buffer = [0u8; SEND_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer).await.context("read staged file")?;
        if read == 0 {
            break;
        }
        stream
            .write_all(&buffer[..read])
            .await
            .context("write file bytes")?;
    }

    stream.shutdown().await.context("close transfer stream")?;
    Ok(())
}
