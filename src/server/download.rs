//! Download relay: bridges an inbound HTTP request to the outbound
//! one-shot transfer connection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Response};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::common::AppError;
use crate::server::state::AppState;

/// Name used when the transfer header is malformed or absent.
const DEFAULT_DOWNLOAD_NAME: &str = "downloaded-file";

const FILENAME_MARKER: &str = "Filename: ";

#[derive(Deserialize)]
pub struct DownloadQuery {
    token: Option<String>,
}

/// Staged relay file, removed on every exit route.
struct StagedDownload {
    path: PathBuf,
}

impl StagedDownload {
    fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("skylink-download-{}.tmp", Uuid::new_v4())),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedDownload {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to remove staged download");
            }
        }
    }
}

/// Content type inferred from the recovered file name. The table mirrors the
/// upload allowlist; anything else is generic binary.
fn content_type_for_name(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Resolves a token, relays the one-shot transfer, and streams the file back
/// with attachment headers. The offer is consumed on success.
pub async fn download_handler(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response<Body>, AppError> {
    let token = query.token.unwrap_or_default();
    let port = state
        .registry
        .resolve_token(&token)
        .ok_or_else(|| AppError::AccessDenied("Invalid or missing token".to_string()))?;
    let host = state
        .registry
        .host_of(port)
        .unwrap_or_else(|| "localhost".to_string());

    // The relay deliberately blocks this worker for the whole downstream
    // transfer; a stalled listener holds it until the peer's deadline fires.
    let staged = StagedDownload::new();
    let file_name = relay_to_staging(&host, port, staged.path())
        .await
        .context("relay transfer from peer")?;

    state.registry.cleanup(port);

    let file = tokio::fs::File::open(staged.path())
        .await
        .context("open staged download")?;
    let length = file
        .metadata()
        .await
        .context("stat staged download")?
        .len();

    tracing::info!(port, file = %file_name, bytes = length, "download relayed");

    // The staging file is unlinked when `staged` drops at the end of this
    // scope; the open handle keeps the bytes readable for the stream.
    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type_for_name(&file_name))
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .context("build response")?;

    Ok(response)
}

/// Dials the transfer listener, recovers the announced file name, and writes
/// the remaining connection bytes to `staging`.
async fn relay_to_staging(host: &str, port: u16, staging: &Path) -> Result<String> {
    let stream = TcpStream::connect((host, port))
        .await
        .context("connect to transfer listener")?;
    let mut reader = BufReader::new(stream);

    // Single metadata line precedes the payload; everything after the first
    // newline is raw file bytes.
    let mut header_line = Vec::new();
    reader
        .read_until(b'\n', &mut header_line)
        .await
        .context("read transfer header")?;

    let header_text = String::from_utf8_lossy(&header_line);
    let file_name = header_text
        .trim()
        .strip_prefix(FILENAME_MARKER)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DOWNLOAD_NAME)
        .to_string();

    let mut out = tokio::fs::File::create(staging)
        .await
        .context("create staging file")?;
    tokio::io::copy(&mut reader, &mut out)
        .await
        .context("stage transfer bytes")?;
    out.flush().await.context("flush staging file")?;

    Ok(file_name)
}
