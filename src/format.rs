//! Human-readable formatting helpers shared by the HTTP endpoints.
//!
//! Two size notations are in use:
//! - spaced units with two decimals (`"1.50 KB"`) for disk and memory
//! - compact symbols (`"1.5K"`, `"512B"`) for network and process counters

const SPACED_UNITS: [&str; 6] = ["", "K", "M", "G", "T", "P"];
const COMPACT_SYMBOLS: [char; 8] = ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

/// Bytes in one GiB.
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Formats a byte count as `"<value> <unit>B"` with two decimals.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in &SPACED_UNITS[..SPACED_UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}B");
        }
        value /= 1024.0;
    }
    format!("{value:.2} {}B", SPACED_UNITS[SPACED_UNITS.len() - 1])
}

/// Formats a byte count in compact binary notation with `decimals` precision.
///
/// Values below 1 KiB are printed verbatim with a `B` suffix.
pub fn bytes_to_human(bytes: u64, decimals: usize) -> String {
    for (i, symbol) in COMPACT_SYMBOLS.iter().enumerate().rev() {
        let prefix = 1u128 << ((i + 1) * 10);
        if u128::from(bytes) >= prefix {
            let value = bytes as f64 / prefix as f64;
            return format!("{value:.decimals$}{symbol}");
        }
    }
    format!("{bytes}B")
}

/// Formats bytes as gibibytes, e.g. `"15.54 GB"`.
pub fn format_gib(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

/// Formats a percentage with two decimals, e.g. `"33.33%"`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Rounds to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
