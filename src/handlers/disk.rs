//! Disk endpoint handler.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::{debug, error, instrument};

use system_monitor::collectors::filesystem::{
    read_partitions, readable, DiskTotals, PartitionReading,
};
use system_monitor::format::{format_percent, format_size};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PartitionInfo {
    pub device: String,
    pub total: String,
    pub used: String,
    pub free: String,
    pub used_percent: String,
    pub free_percent: String,
    pub fstype: String,
    pub mountpoint: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DiskResponse {
    pub total: String,
    pub used: String,
    pub free: String,
    pub used_percent: String,
    pub free_percent: String,
    pub partitions: Vec<PartitionInfo>,
}

/// Builds the response from partition readings, skipping unreadable ones.
pub fn disk_response(readings: &[PartitionReading]) -> DiskResponse {
    let partitions = readable(readings)
        .map(|(mount, usage)| {
            let used_percent = usage.used_percent();
            PartitionInfo {
                device: mount.device.clone(),
                total: format_size(usage.total_bytes),
                used: format_size(usage.used_bytes),
                free: format_size(usage.free_bytes),
                used_percent: format_percent(used_percent),
                free_percent: format_percent(if usage.total_bytes == 0 {
                    0.0
                } else {
                    100.0 - used_percent
                }),
                fstype: mount.fstype.clone(),
                mountpoint: mount.mount_point.clone(),
            }
        })
        .collect();

    let totals = DiskTotals::from_readings(readings);
    DiskResponse {
        total: format_size(totals.total_bytes),
        used: format_size(totals.used_bytes),
        free: format_size(totals.free_bytes),
        used_percent: format_percent(totals.used_percent()),
        free_percent: format_percent(totals.free_percent()),
        partitions,
    }
}

/// Handler for /api/v1/disk.
#[instrument]
pub async fn disk_handler() -> Result<Json<DiskResponse>, (StatusCode, String)> {
    debug!("Processing /api/v1/disk request");

    let readings = tokio::task::spawn_blocking(read_partitions)
        .await
        .map_err(|e| {
            error!("Partition scan task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(disk_response(&readings)))
}
