//! Documentation endpoint handler.
//!
//! This module provides the `/docs` endpoint handler that describes every
//! endpoint and the configuration file in plain text.

use axum::{http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

/// Handler for the /docs endpoint.
#[instrument]
pub async fn doc_handler() -> impl IntoResponse {
    debug!("Processing /docs request");

    let version = env!("CARGO_PKG_VERSION");
    let doc = format!(
        r#"SYSTEM MONITOR API - DOCUMENTATION
==================================

VERSION: {version}
DESCRIPTION: Host metrics API and fleet registration agent

HTTP ENDPOINTS
--------------
GET /                        - API name, version and links
GET /health                  - Liveness check
GET /docs                    - This documentation (plain text)
GET /api/v1/cpu/             - Physical core count, overall and per-core utilization,
                               load averages as a percentage of logical cores
GET /api/v1/memory/          - Total/available/used/free, percent, and the
                               active/inactive/buffers/cached/shared/slab breakdown
GET /api/v1/disk/            - Capacity aggregated over readable partitions plus
                               per-partition usage
GET /api/v1/network/         - Aggregated interface counters, socket and interface
                               counts, per-interface statistics
GET /api/v1/network/details  - Per-interface counters including errors and drops
GET /api/v1/process/         - Every process with CPU, memory, I/O and connections;
                               zombies are flagged with is_zombie
GET /api/v1/sensors/         - Temperatures, fans and battery
GET /api/v1/system/          - Boot time, uptime, platform and logged-in users

All routes answer with and without a trailing slash.

REGISTRATION
------------
`system-monitor register` upserts one row per host into the server_info
table every registration.interval_secs (default 1). Lost connections are
re-opened every registration.reconnect_backoff_secs (default 5) until they
succeed. A failed initial connection exits with status 1.

CONFIGURATION
-------------
Config file locations (in order):
  1. --config <path>
  2. /etc/system-monitor/config.{{yaml,yml,toml,json}}
  3. ./system-monitor.{{yaml,yml,toml,json}}

Generate a template with: system-monitor config --commented -o -
"#
    );

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        doc,
    )
}
