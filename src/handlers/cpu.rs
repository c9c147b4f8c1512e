//! CPU endpoint handler.

use axum::{extract::State, Json};
use serde::Serialize;
use sysinfo::System;
use tracing::{debug, instrument};

use crate::state::SharedState;
use system_monitor::format::round2;

#[derive(Debug, Serialize)]
pub struct CpuResponse {
    pub physical_cpu_count: Option<usize>,
    pub cpu_utilization: f32,
    pub per_cpu_utilization: Vec<f32>,
    /// 1, 5 and 15 minute load as a percentage of logical cores.
    pub load_avg: [f64; 3],
}

/// Load averages scaled by the number of logical cores, two decimals.
///
/// Platforms without load averages report zeros.
pub fn load_percentages(load: [f64; 3], logical_cpus: usize) -> [f64; 3] {
    if logical_cpus == 0 {
        return [0.0; 3];
    }
    load.map(|l| round2(l / logical_cpus as f64 * 100.0))
}

/// Handler for /api/v1/cpu.
///
/// Utilization is measured over the configured sample window.
#[instrument(skip(state))]
pub async fn cpu_handler(State(state): State<SharedState>) -> Json<CpuResponse> {
    debug!("Processing /api/v1/cpu request");

    let mut system = System::new();
    system.refresh_cpu();
    tokio::time::sleep(state.sample_window).await;
    system.refresh_cpu();

    let load = System::load_average();
    let logical = system.cpus().len();

    Json(CpuResponse {
        physical_cpu_count: system.physical_core_count(),
        cpu_utilization: system.global_cpu_info().cpu_usage(),
        per_cpu_utilization: system.cpus().iter().map(|c| c.cpu_usage()).collect(),
        load_avg: load_percentages([load.one, load.five, load.fifteen], logical),
    })
}
