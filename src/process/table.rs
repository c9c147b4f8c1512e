//! Process enumeration through sysinfo.

use crate::collectors::netdev::inet_socket_inodes;
use crate::process::entry::{build_entries, ProcessEntry, RawProcess};
use crate::process::scanner::{read_detail, PROC_ROOT};
use std::path::Path;
use sysinfo::{ProcessStatus, System, Users};

/// Long-lived process table.
///
/// Per-process CPU usage is a delta between two refreshes, so the same
/// `System` is kept across requests.
pub struct ProcessTable {
    system: System,
    users: Users,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            users: Users::new_with_refreshed_list(),
        }
    }

    /// Refreshes and enumerates every process.
    pub fn enumerate(&mut self) -> Vec<RawProcess> {
        self.system.refresh_memory();
        self.system.refresh_processes();
        let total_memory = self.system.total_memory();

        self.system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let status = process.status();
                let io = process.disk_usage();
                RawProcess {
                    pid: pid.as_u32(),
                    name: process.name().to_string(),
                    username: process
                        .user_id()
                        .and_then(|uid| self.users.get_user_by_id(uid))
                        .map(|user| user.name().to_string()),
                    status: status_name(status),
                    is_zombie: status == ProcessStatus::Zombie,
                    cpu_percent: process.cpu_usage(),
                    memory_percent: if total_memory == 0 {
                        0.0
                    } else {
                        (process.memory() as f64 / total_memory as f64 * 100.0) as f32
                    },
                    rss_bytes: process.memory(),
                    vms_bytes: process.virtual_memory(),
                    create_time: process.start_time(),
                    exe: process.exe().map(|p| p.display().to_string()),
                    read_bytes: io.total_read_bytes,
                    write_bytes: io.total_written_bytes,
                }
            })
            .collect()
    }

    /// Enumerates processes and reads their details.
    pub fn entries(&mut self) -> Vec<ProcessEntry> {
        let raws = self.enumerate();
        let inet_inodes = inet_socket_inodes();
        build_entries(raws, |pid| read_detail(Path::new(PROC_ROOT), pid, &inet_inodes))
    }
}

/// Lower-case status names (`"sleeping"`, `"disk-sleep"`, ...).
pub fn status_name(status: ProcessStatus) -> String {
    match status {
        ProcessStatus::Run => "running".to_string(),
        ProcessStatus::Sleep => "sleeping".to_string(),
        ProcessStatus::Idle => "idle".to_string(),
        ProcessStatus::Stop => "stopped".to_string(),
        ProcessStatus::Zombie => "zombie".to_string(),
        ProcessStatus::Dead => "dead".to_string(),
        ProcessStatus::Tracing => "tracing-stop".to_string(),
        ProcessStatus::UninterruptibleDiskSleep => "disk-sleep".to_string(),
        other => other.to_string().to_lowercase(),
    }
}
