//! Router definitions for the control plane.

use axum::routing::{get, post};
use axum::Router;

use crate::server::state::AppState;
use crate::server::{download, upload};

/// Build the two-route control-plane router. Wrong methods on a registered
/// path get 405 from the method router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload::upload_handler))
        .route("/download", get(download::download_handler))
        .with_state(state)
}
