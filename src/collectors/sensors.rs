//! Hardware sensor collector.
//!
//! This module collects readings from sysfs:
//! - /sys/class/hwmon/hwmon*/temp*_{input,label,max,crit}
//! - /sys/class/hwmon/hwmon*/fan*_{input,label}
//! - /sys/class/power_supply/*/{type,capacity,status,energy_now,power_now}

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const HWMON_BASE: &str = "/sys/class/hwmon";
pub const POWER_SUPPLY_BASE: &str = "/sys/class/power_supply";

/// Battery time left while on AC power.
pub const POWER_TIME_UNLIMITED: i64 = -2;
/// Battery time left when it cannot be estimated.
pub const POWER_TIME_UNKNOWN: i64 = -1;

/// One temperature sensor, in degrees Celsius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub label: String,
    pub current: f64,
    pub high: Option<f64>,
    pub critical: Option<f64>,
}

/// One fan sensor, in RPM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanReading {
    pub label: String,
    pub current: u64,
}

/// Readings grouped by hwmon chip name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HwmonReadings {
    pub temperatures: BTreeMap<String, Vec<TemperatureReading>>,
    pub fans: BTreeMap<String, Vec<FanReading>>,
}

/// Battery charge state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryStatus {
    pub percent: f64,
    pub secsleft: i64,
    pub power_plugged: bool,
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_number(path: &Path) -> Option<i64> {
    read_trimmed(path)?.parse().ok()
}

/// Extracts the sensor index from names like `temp3_input`.
fn sensor_index(file_name: &str, prefix: &str) -> Option<u32> {
    file_name
        .strip_prefix(prefix)?
        .strip_suffix("_input")?
        .parse()
        .ok()
}

/// Reads temperature and fan sensors below an hwmon class directory.
///
/// Returns empty maps when the directory does not exist.
pub fn read_hwmon(base: &Path) -> HwmonReadings {
    let mut readings = HwmonReadings::default();

    let Ok(entries) = fs::read_dir(base) else {
        return readings;
    };

    let mut chips: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    chips.sort();

    for path in chips {
        let hwmon_name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };

        // Only process hwmon* directories
        if !hwmon_name.starts_with("hwmon") {
            continue;
        }

        let chip = read_trimmed(&path.join("name")).unwrap_or_else(|| hwmon_name.clone());

        let Ok(files) = fs::read_dir(&path) else {
            continue;
        };
        let names: Vec<String> = files
            .flatten()
            .map(|f| f.file_name().to_string_lossy().to_string())
            .collect();

        let mut temp_indices: Vec<u32> = names
            .iter()
            .filter_map(|n| sensor_index(n, "temp"))
            .collect();
        temp_indices.sort_unstable();

        let mut fan_indices: Vec<u32> = names
            .iter()
            .filter_map(|n| sensor_index(n, "fan"))
            .collect();
        fan_indices.sort_unstable();

        for idx in temp_indices {
            // Read temperature (in millidegrees Celsius)
            let Some(millidegrees) = read_number(&path.join(format!("temp{idx}_input"))) else {
                continue;
            };
            let celsius = |file: String| read_number(&path.join(file)).map(|v| v as f64 / 1000.0);

            readings
                .temperatures
                .entry(chip.clone())
                .or_default()
                .push(TemperatureReading {
                    label: read_trimmed(&path.join(format!("temp{idx}_label"))).unwrap_or_default(),
                    current: millidegrees as f64 / 1000.0,
                    high: celsius(format!("temp{idx}_max")),
                    critical: celsius(format!("temp{idx}_crit")),
                });
        }

        for idx in fan_indices {
            let Some(rpm) = read_number(&path.join(format!("fan{idx}_input"))) else {
                continue;
            };
            readings.fans.entry(chip.clone()).or_default().push(FanReading {
                label: read_trimmed(&path.join(format!("fan{idx}_label"))).unwrap_or_default(),
                current: u64::try_from(rpm).unwrap_or(0),
            });
        }
    }

    readings
}

/// Reads the first battery below a power_supply class directory.
pub fn read_battery(base: &Path) -> Option<BatteryStatus> {
    let entries = fs::read_dir(base).ok()?;
    let mut supplies: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    supplies.sort();

    let ac_online = supplies.iter().any(|p| {
        read_trimmed(&p.join("type")).as_deref() == Some("Mains")
            && read_number(&p.join("online")) == Some(1)
    });

    let battery = supplies
        .iter()
        .find(|p| read_trimmed(&p.join("type")).as_deref() == Some("Battery"))?;

    let percent = read_number(&battery.join("capacity"))? as f64;
    let status = read_trimmed(&battery.join("status")).unwrap_or_default();
    let power_plugged = match status.as_str() {
        "Charging" | "Full" | "Not charging" => true,
        "Discharging" => false,
        _ => ac_online,
    };

    let secsleft = if power_plugged {
        POWER_TIME_UNLIMITED
    } else {
        let energy = read_number(&battery.join("energy_now"))
            .or_else(|| read_number(&battery.join("charge_now")));
        let power = read_number(&battery.join("power_now"))
            .or_else(|| read_number(&battery.join("current_now")));
        match (energy, power) {
            (Some(e), Some(p)) if p > 0 => e * 3600 / p,
            _ => POWER_TIME_UNKNOWN,
        }
    };

    Some(BatteryStatus {
        percent,
        secsleft,
        power_plugged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(dir: &Path, file: &str, content: &str) {
        fs::write(dir.join(file), content).unwrap();
    }

    fn make_dir(base: &Path, name: &str) -> PathBuf {
        let dir = base.join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_read_hwmon_groups_by_chip() {
        let tmp = tempfile::tempdir().unwrap();
        let chip = make_dir(tmp.path(), "hwmon0");
        write(&chip, "name", "coretemp\n");
        write(&chip, "temp1_input", "45000\n");
        write(&chip, "temp1_label", "Package id 0\n");
        write(&chip, "temp1_max", "80000\n");
        write(&chip, "temp1_crit", "100000\n");
        write(&chip, "temp2_input", "43500\n");

        let fans = make_dir(tmp.path(), "hwmon1");
        write(&fans, "name", "thinkpad\n");
        write(&fans, "fan1_input", "2100\n");

        make_dir(tmp.path(), "not-a-chip");

        let readings = read_hwmon(tmp.path());
        let core = &readings.temperatures["coretemp"];
        assert_eq!(core.len(), 2);
        assert_eq!(core[0].label, "Package id 0");
        assert_eq!(core[0].current, 45.0);
        assert_eq!(core[0].high, Some(80.0));
        assert_eq!(core[0].critical, Some(100.0));
        assert_eq!(core[1].label, "");
        assert_eq!(core[1].current, 43.5);
        assert_eq!(core[1].high, None);

        assert_eq!(readings.fans["thinkpad"][0].current, 2100);
    }

    #[test]
    fn test_read_hwmon_missing_base() {
        let readings = read_hwmon(Path::new("/nonexistent/hwmon"));
        assert!(readings.temperatures.is_empty());
        assert!(readings.fans.is_empty());
    }

    #[test]
    fn test_read_battery_discharging() {
        let tmp = tempfile::tempdir().unwrap();
        let bat = make_dir(tmp.path(), "BAT0");
        write(&bat, "type", "Battery\n");
        write(&bat, "capacity", "76\n");
        write(&bat, "status", "Discharging\n");
        write(&bat, "energy_now", "30000000\n");
        write(&bat, "power_now", "10000000\n");

        let status = read_battery(tmp.path()).unwrap();
        assert_eq!(status.percent, 76.0);
        assert!(!status.power_plugged);
        assert_eq!(status.secsleft, 3 * 3600);
    }

    #[test]
    fn test_read_battery_charging_is_unlimited() {
        let tmp = tempfile::tempdir().unwrap();
        let bat = make_dir(tmp.path(), "BAT1");
        write(&bat, "type", "Battery\n");
        write(&bat, "capacity", "40\n");
        write(&bat, "status", "Charging\n");

        let status = read_battery(tmp.path()).unwrap();
        assert!(status.power_plugged);
        assert_eq!(status.secsleft, POWER_TIME_UNLIMITED);
    }

    #[test]
    fn test_read_battery_none() {
        let tmp = tempfile::tempdir().unwrap();
        let ac = make_dir(tmp.path(), "AC");
        write(&ac, "type", "Mains\n");
        write(&ac, "online", "1\n");
        assert!(read_battery(tmp.path()).is_none());
    }
}
