//! Process entries as reported by the process endpoint.
//!
//! Enumeration and detail reads are separate steps, so a process can exit or
//! turn into a zombie in between. [`build_entries`] turns raw enumeration
//! results plus a detail reader into the final list:
//! - a process enumerated as zombie gets a reduced entry right away,
//! - a detail read reporting a zombie falls back to the same reduced entry,
//! - vanished or inaccessible processes are skipped.

use crate::format::bytes_to_human;
use crate::process::scanner::{DetailError, ProcessDetail};
use serde::Serialize;
use tracing::debug;

/// One process as seen by enumeration, before any detail read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProcess {
    pub pid: u32,
    pub name: String,
    pub username: Option<String>,
    pub status: String,
    pub is_zombie: bool,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub rss_bytes: u64,
    pub vms_bytes: u64,
    /// Start time, seconds since epoch.
    pub create_time: u64,
    pub exe: Option<String>,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub username: Option<String>,
    pub status: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub rss: Option<String>,
    pub vms: Option<String>,
    pub create_time: u64,
    pub exe: Option<String>,
    pub num_threads: Option<u64>,
    pub read: String,
    pub write: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// `None` for zombies, whose sockets cannot be inspected.
    pub connections: Option<usize>,
    pub is_zombie: bool,
}

impl ProcessEntry {
    /// Full entry for a live process.
    pub fn live(raw: RawProcess, detail: ProcessDetail) -> Self {
        Self {
            pid: raw.pid,
            name: raw.name,
            username: raw.username,
            status: raw.status,
            cpu_percent: raw.cpu_percent,
            memory_percent: raw.memory_percent,
            rss: Some(bytes_to_human(raw.rss_bytes, 1)),
            vms: Some(bytes_to_human(raw.vms_bytes, 1)),
            create_time: raw.create_time,
            exe: raw.exe,
            num_threads: detail.num_threads,
            read: bytes_to_human(raw.read_bytes, 1),
            write: bytes_to_human(raw.write_bytes, 1),
            read_bytes: raw.read_bytes,
            write_bytes: raw.write_bytes,
            connections: Some(detail.connections),
            is_zombie: false,
        }
    }

    /// Reduced entry for a zombie: identity only, no I/O or connections.
    pub fn zombie(raw: RawProcess) -> Self {
        Self {
            pid: raw.pid,
            name: raw.name,
            username: raw.username,
            status: "zombie".to_string(),
            cpu_percent: 0.0,
            memory_percent: 0.0,
            rss: None,
            vms: None,
            create_time: raw.create_time,
            exe: None,
            num_threads: None,
            read: bytes_to_human(0, 1),
            write: bytes_to_human(0, 1),
            read_bytes: 0,
            write_bytes: 0,
            connections: None,
            is_zombie: true,
        }
    }
}

/// Combines enumeration results with per-process detail reads.
///
/// Output is ordered by pid.
pub fn build_entries<F>(mut raws: Vec<RawProcess>, read_detail: F) -> Vec<ProcessEntry>
where
    F: Fn(u32) -> Result<ProcessDetail, DetailError>,
{
    raws.sort_by_key(|raw| raw.pid);

    let mut entries = Vec::with_capacity(raws.len());
    for raw in raws {
        if raw.is_zombie {
            entries.push(ProcessEntry::zombie(raw));
            continue;
        }

        match read_detail(raw.pid) {
            Ok(detail) => entries.push(ProcessEntry::live(raw, detail)),
            Err(DetailError::Zombie(pid)) => {
                debug!("Process {} became a zombie during detail read", pid);
                entries.push(ProcessEntry::zombie(raw));
            }
            Err(e @ (DetailError::Vanished(_) | DetailError::AccessDenied(_))) => {
                debug!("Skipping process: {}", e);
            }
        }
    }
    entries
}
