//! HTTP endpoint handlers for the API.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: API name and version
//! - `/health`: Liveness check
//! - `/docs`: Plain-text documentation
//! - `/api/v1/{cpu,memory,disk,network,process,sensors,system}`: per-domain
//!   host metrics

use axum::{routing::get, Router};

use crate::state::SharedState;

pub mod cpu;
pub mod disk;
pub mod doc;
pub mod health;
pub mod memory;
pub mod network;
pub mod process;
pub mod root;
pub mod sensors;
pub mod system;

// Re-export handlers
pub use cpu::cpu_handler;
pub use disk::disk_handler;
pub use doc::doc_handler;
pub use health::health_handler;
pub use memory::memory_handler;
pub use network::{network_details_handler, network_handler};
pub use process::process_handler;
pub use root::root_handler;
pub use sensors::sensors_handler;
pub use system::system_handler;

/// Builds the API router. Metric routes are registered with and without a
/// trailing slash.
pub fn router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/docs", get(doc_handler));

    let metric_routes: [(&str, axum::routing::MethodRouter<SharedState>); 8] = [
        ("/api/v1/cpu", get(cpu_handler)),
        ("/api/v1/memory", get(memory_handler)),
        ("/api/v1/disk", get(disk_handler)),
        ("/api/v1/network", get(network_handler)),
        ("/api/v1/network/details", get(network_details_handler)),
        ("/api/v1/process", get(process_handler)),
        ("/api/v1/sensors", get(sensors_handler)),
        ("/api/v1/system", get(system_handler)),
    ];

    for (path, handler) in metric_routes {
        app = app
            .route(path, handler.clone())
            .route(&format!("{path}/"), handler);
    }

    app.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use std::sync::Arc;
    use system_monitor::config::Config;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Serves the router on an ephemeral port and performs one GET.
    async fn get(uri: &str) -> (u16, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(AppState::new(Config::default())));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {uri} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        let status = raw
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let body = raw
            .split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap_or_default();
        (status, body)
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = get("/").await;
        assert_eq!(status, 200);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["message"], "System Monitor API");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["health"], "/health");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;
        assert_eq!(status, 200);
        assert_eq!(body, r#"{"status":"healthy"}"#);
    }

    #[tokio::test]
    async fn test_trailing_slash_variants() {
        for uri in ["/api/v1/memory", "/api/v1/memory/", "/api/v1/system/"] {
            let (status, _) = get(uri).await;
            assert_eq!(status, 200, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get("/api/v2/cpu").await;
        assert_eq!(status, 404);
    }
}
