//! Sensors endpoint handler.

use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

use system_monitor::collectors::sensors::{
    read_battery, read_hwmon, BatteryStatus, FanReading, TemperatureReading, HWMON_BASE,
    POWER_SUPPLY_BASE,
};

pub const NOT_SUPPORTED: &str = "Not supported on this platform";
pub const NO_BATTERY: &str = "No battery information available";

/// Sensor data, or a message explaining why there is none.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Reading<T> {
    Available(T),
    Unavailable(&'static str),
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SensorsResponse {
    pub temperatures: Reading<BTreeMap<String, Vec<TemperatureReading>>>,
    pub fans: Reading<BTreeMap<String, Vec<FanReading>>>,
    pub battery: Reading<BatteryStatus>,
}

/// Reads sensors below the given sysfs class directories.
pub fn sensors_response(hwmon: &Path, power_supply: &Path) -> SensorsResponse {
    if !cfg!(target_os = "linux") {
        return SensorsResponse {
            temperatures: Reading::Unavailable(NOT_SUPPORTED),
            fans: Reading::Unavailable(NOT_SUPPORTED),
            battery: Reading::Unavailable(NOT_SUPPORTED),
        };
    }

    let readings = read_hwmon(hwmon);
    SensorsResponse {
        temperatures: Reading::Available(readings.temperatures),
        fans: Reading::Available(readings.fans),
        battery: match read_battery(power_supply) {
            Some(status) => Reading::Available(status),
            None => Reading::Unavailable(NO_BATTERY),
        },
    }
}

/// Handler for /api/v1/sensors.
#[instrument]
pub async fn sensors_handler() -> Json<SensorsResponse> {
    debug!("Processing /api/v1/sensors request");
    Json(sensors_response(
        Path::new(HWMON_BASE),
        Path::new(POWER_SUPPLY_BASE),
    ))
}
