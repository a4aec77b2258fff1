//! Health check endpoint for liveness probes.

use axum::http::StatusCode;

/// Returns 200 with the body `ok` while the server accepts connections.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
