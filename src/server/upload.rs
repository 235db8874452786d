//! Upload admission: validation, rate limiting, staging, and offer creation.

use std::net::SocketAddr;

use anyhow::{anyhow, Context};
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::common::AppError;
use crate::server::state::AppState;
use crate::transfer::listener;
use crate::utils::{multipart, security};

/// Extensions accepted for upload: textual, document, image, and archive
/// formats only.
const ALLOWED_EXTENSIONS: &[&str] = &[
    ".txt", ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".doc", ".docx", ".csv",
];

/// Accepted part-level MIME types, matched by prefix.
const ALLOWED_MIME_TYPES: &[&str] = &[
    "text/plain",
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/zip",
    "application/x-zip-compressed",
    "application/x-zip",
    "application/octet-stream",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/csv",
];

fn is_allowed_extension(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn is_allowed_mime_type(mime: &str) -> bool {
    let lower = mime.to_ascii_lowercase();
    ALLOWED_MIME_TYPES
        .iter()
        .any(|allowed| lower.starts_with(allowed))
}

/// Admits one upload and registers it as a downloadable offer.
///
/// The size ceiling is enforced at three independent points: the declared
/// Content-Length before any body read, the cumulative bytes actually read
/// while streaming, and the extracted payload length after parsing.
pub async fn upload_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>, AppError> {
    let max_size = state.config.max_file_size;
    let size_message = || format!("Maximum file size is {}MB", state.config.max_file_size_mb());

    if !state.limiter.admit(addr.ip()) {
        return Err(AppError::RateLimited(format!(
            "Max {} uploads per minute",
            state.limiter.limit()
        )));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("multipart/form-data") {
        return Err(AppError::BadRequest(
            "Content-Type must be multipart/form-data".to_string(),
        ));
    }
    let boundary = multipart::boundary_from_content_type(content_type)
        .ok_or_else(|| AppError::BadRequest("boundary missing in Content-Type".to_string()))?;

    // First checkpoint: the declared length, before reading anything.
    if let Some(declared) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
    {
        if declared > max_size {
            return Err(AppError::PayloadTooLarge(size_message()));
        }
    }

    // Second checkpoint: cumulative bytes read, aborting early instead of
    // buffering past the ceiling.
    let mut raw_body: Vec<u8> = Vec::new();
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("read request body")?;
        if raw_body.len() as u64 + chunk.len() as u64 > max_size {
            return Err(AppError::PayloadTooLarge(size_message()));
        }
        raw_body.extend_from_slice(&chunk);
    }

    let part = multipart::extract_file_part(&raw_body, &boundary)
        .ok_or_else(|| AppError::BadRequest("Could not parse file content".to_string()))?;

    // Third checkpoint: the recovered payload itself, which covers encoding
    // overhead miscounts in the first two.
    if part.data.len() as u64 > max_size {
        return Err(AppError::PayloadTooLarge(size_message()));
    }

    let file_name = if part.file_name.trim().is_empty() {
        security::FALLBACK_FILE_NAME.to_string()
    } else {
        part.file_name.clone()
    };

    if !is_allowed_extension(&file_name) {
        return Err(AppError::UnsupportedType(format!(
            "File type not allowed. Allowed extensions: {} only",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let declared_mime = part.content_type.as_deref().unwrap_or_default();
    if !is_allowed_mime_type(declared_mime) {
        return Err(AppError::UnsupportedType(format!(
            "MIME type not allowed. Allowed types: {}",
            ALLOWED_MIME_TYPES.join(", ")
        )));
    }

    let staged_path = state
        .config
        .upload_dir
        .join(security::staged_file_name(&file_name));
    tokio::fs::write(&staged_path, &part.data)
        .await
        .context("write staged upload")?;

    let uploader_host = addr.ip().to_string();
    let port = state.registry.allocate(staged_path, uploader_host);
    let token = state
        .registry
        .token_of(port)
        .ok_or_else(|| anyhow!("token missing for freshly allocated port {port}"))?;

    // One dedicated task per offer; it lives through a single
    // accept-and-send cycle and exits.
    let registry = state.registry.clone();
    tokio::spawn(async move {
        listener::serve_offer(registry, port).await;
    });

    tracing::info!(port, source = %addr.ip(), file = %file_name, "upload accepted");

    Ok(Json(json!({ "port": port, "token": token })))
}
