//! System information endpoint handler.

use axum::Json;
use serde::Serialize;
use std::path::Path;
use sysinfo::System;
use tracing::{debug, instrument};

use system_monitor::collectors::sessions::{read_sessions, UserSession, UTMP_PATH};
use system_monitor::format::round2;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Serialize)]
pub struct SystemResponse {
    pub boot_time_timestamp: u64,
    pub uptime_days: f64,
    pub uptime_seconds: u64,
    pub platform: String,
    pub platform_release: String,
    pub users: Vec<UserSession>,
}

/// OS family name in the conventional capitalisation (`Linux`, `Darwin`, ...).
pub fn platform_name() -> String {
    match std::env::consts::OS {
        "linux" => "Linux".to_string(),
        "macos" => "Darwin".to_string(),
        "windows" => "Windows".to_string(),
        "freebsd" => "FreeBSD".to_string(),
        other => other.to_string(),
    }
}

/// Uptime derived from the boot timestamp and the current time.
pub fn uptime(boot_time: u64, now: u64) -> (u64, f64) {
    let seconds = now.saturating_sub(boot_time);
    (seconds, round2(seconds as f64 / SECONDS_PER_DAY))
}

/// Handler for /api/v1/system.
#[instrument]
pub async fn system_handler() -> Json<SystemResponse> {
    debug!("Processing /api/v1/system request");

    let boot_time = System::boot_time();
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    let (uptime_seconds, uptime_days) = uptime(boot_time, now);

    Json(SystemResponse {
        boot_time_timestamp: boot_time,
        uptime_days,
        uptime_seconds,
        platform: platform_name(),
        platform_release: System::kernel_version().unwrap_or_default(),
        users: read_sessions(Path::new(UTMP_PATH)),
    })
}
