//! Root endpoint handler.
//!
//! This module provides the `/` endpoint handler that reports the API name,
//! version and where to find the docs and health endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub docs: &'static str,
    pub health: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_timestamp: Option<&'static str>,
    pub uptime_seconds: u64,
}

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> Json<RootResponse> {
    debug!("Processing / request");

    Json(RootResponse {
        message: "System Monitor API",
        version: env!("CARGO_PKG_VERSION"),
        docs: "/docs",
        health: "/health",
        build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
