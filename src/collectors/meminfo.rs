//! Extended memory information from /proc/meminfo.
//!
//! sysinfo reports totals only; the page-cache breakdown shown by the memory
//! endpoint comes from here. Every field is optional since the set of keys
//! varies across kernels and is absent on non-Linux hosts.

use std::collections::HashMap;
use std::fs;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Page-cache and slab breakdown, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedMemoryInfo {
    pub active_bytes: Option<u64>,
    pub inactive_bytes: Option<u64>,
    pub buffers_bytes: Option<u64>,
    /// `Cached` plus reclaimable slab, matching what `free` reports.
    pub cached_bytes: Option<u64>,
    pub shared_bytes: Option<u64>,
    pub slab_bytes: Option<u64>,
}

/// Reads extended memory information, or all-`None` when unavailable.
pub fn read_extended_memory_info() -> ExtendedMemoryInfo {
    fs::read_to_string(MEMINFO_PATH)
        .map(|content| parse_extended_memory_info(&content))
        .unwrap_or_default()
}

/// Parses /proc/meminfo content into the extended breakdown.
pub fn parse_extended_memory_info(content: &str) -> ExtendedMemoryInfo {
    let fields = parse_meminfo_fields(content);
    let get = |key: &str| fields.get(key).copied();

    let cached_bytes = match (get("Cached"), get("SReclaimable")) {
        (Some(cached), Some(reclaimable)) => Some(cached + reclaimable),
        (cached, _) => cached,
    };

    ExtendedMemoryInfo {
        active_bytes: get("Active"),
        inactive_bytes: get("Inactive"),
        buffers_bytes: get("Buffers"),
        cached_bytes,
        shared_bytes: get("Shmem"),
        slab_bytes: get("Slab"),
    }
}

/// Parses `Key:   <value> kB` lines into bytes.
fn parse_meminfo_fields(content: &str) -> HashMap<&str, u64> {
    let mut fields = HashMap::new();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(Ok(value)) = parts.next().map(str::parse::<u64>) else {
            continue;
        };
        let bytes = match parts.next() {
            Some("kB") => value * 1024,
            _ => value,
        };
        fields.insert(key.trim(), bytes);
    }
    fields
}
