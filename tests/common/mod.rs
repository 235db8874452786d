#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;

use skylink::common::AppConfig;
use skylink::server::ratelimit::RateLimiter;
use skylink::server::{routes, AppState};

pub const TEST_BOUNDARY: &str = "----SkylinkTestBoundary";

pub fn setup_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

pub fn test_config(upload_dir: PathBuf) -> AppConfig {
    AppConfig {
        port: 0,
        upload_dir,
        ..AppConfig::default()
    }
}

//============
// App Factory
//============

pub fn create_test_app(upload_dir: PathBuf) -> (Router, AppState) {
    create_test_app_with_config(test_config(upload_dir))
}

pub fn create_test_app_with_config(config: AppConfig) -> (Router, AppState) {
    let state = AppState::new(config);
    (routes::router(state.clone()), state)
}

pub fn create_test_app_with_limiter(
    upload_dir: PathBuf,
    limit: u32,
    window: Duration,
) -> (Router, AppState) {
    let state = AppState::with_limiter(test_config(upload_dir), RateLimiter::new(limit, window));
    (routes::router(state.clone()), state)
}

/// Address the handlers see as the requesting client. Loopback, so the
/// download relay's dial-back lands on the in-process transfer listener.
pub fn client_addr() -> SocketAddr {
    "127.0.0.1:40001".parse().expect("valid socket address")
}

//==================
// Request Builders
//==================

pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{TEST_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{TEST_BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn build_upload_request(file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let body = multipart_body(file_name, content_type, data);
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={TEST_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("Failed to build request");
    request.extensions_mut().insert(ConnectInfo(client_addr()));
    request
}

pub fn build_download_request(token: &str) -> Request<Body> {
    let uri = if token.is_empty() {
        "/download".to_string()
    } else {
        format!("/download?token={token}")
    };
    let mut request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request");
    request.extensions_mut().insert(ConnectInfo(client_addr()));
    request
}

//==========
// Responses
//==========

pub async fn response_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes()
        .to_vec()
}

pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Failed to parse response JSON")
}
