//! Health check endpoint handler.

use axum::Json;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Handler for the /health endpoint. Liveness only.
#[instrument]
pub async fn health_handler() -> Json<HealthResponse> {
    debug!("Processing /health request");
    Json(HealthResponse { status: "healthy" })
}
