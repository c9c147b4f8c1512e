//! Memory endpoint handler.

use axum::Json;
use serde::Serialize;
use sysinfo::System;
use tracing::{debug, instrument};

use system_monitor::collectors::meminfo::{read_extended_memory_info, ExtendedMemoryInfo};
use system_monitor::format::format_gib;

const NOT_AVAILABLE: &str = "NA";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MemoryResponse {
    pub total: String,
    pub available: String,
    pub used: String,
    pub free: String,
    pub percent: String,
    pub active: String,
    pub inactive: String,
    pub buffers: String,
    pub cached: String,
    pub shared: String,
    pub slab: String,
}

/// Raw byte counts reported by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryTotals {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
}

fn optional_gib(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| NOT_AVAILABLE.to_string(), format_gib)
}

/// Builds the response; used percent is `(total - available) / total`.
pub fn memory_response(totals: MemoryTotals, extended: ExtendedMemoryInfo) -> MemoryResponse {
    let percent = if totals.total == 0 {
        0.0
    } else {
        totals.total.saturating_sub(totals.available) as f64 / totals.total as f64 * 100.0
    };

    MemoryResponse {
        total: format_gib(totals.total),
        available: format_gib(totals.available),
        used: format_gib(totals.used),
        free: format_gib(totals.free),
        percent: format!("{percent:.1}%"),
        active: optional_gib(extended.active_bytes),
        inactive: optional_gib(extended.inactive_bytes),
        buffers: optional_gib(extended.buffers_bytes),
        cached: optional_gib(extended.cached_bytes),
        shared: optional_gib(extended.shared_bytes),
        slab: optional_gib(extended.slab_bytes),
    }
}

/// Handler for /api/v1/memory.
#[instrument]
pub async fn memory_handler() -> Json<MemoryResponse> {
    debug!("Processing /api/v1/memory request");

    let mut system = System::new();
    system.refresh_memory();
    let totals = MemoryTotals {
        total: system.total_memory(),
        available: system.available_memory(),
        used: system.used_memory(),
        free: system.free_memory(),
    };

    Json(memory_response(totals, read_extended_memory_info()))
}
