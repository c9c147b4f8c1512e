//! Per-process detail reads from the /proc filesystem.
//!
//! Enumeration happens through sysinfo; this module fills in what sysinfo
//! does not expose (thread count and inet connection count) and is where a
//! process racing to exit is detected.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const PROC_ROOT: &str = "/proc";

/// Details read after enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessDetail {
    pub num_threads: Option<u64>,
    /// Open inet sockets owned by the process.
    pub connections: usize,
}

/// Why a detail read did not produce a [`ProcessDetail`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetailError {
    #[error("process {0} exited before its details could be read")]
    Vanished(u32),
    #[error("access to process {0} denied")]
    AccessDenied(u32),
    #[error("process {0} is a zombie")]
    Zombie(u32),
}

/// Fields of /proc/<pid>/status this crate cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub state: Option<char>,
    pub threads: Option<u64>,
}

/// Parses the `State:` and `Threads:` lines of /proc/<pid>/status.
pub fn parse_status(content: &str) -> StatusFields {
    let mut fields = StatusFields::default();
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("State:") {
            fields.state = rest.trim().chars().next();
        } else if let Some(rest) = line.strip_prefix("Threads:") {
            fields.threads = rest.trim().parse().ok();
        }
    }
    fields
}

/// Extracts the inode from an fd link target like `socket:[12345]`.
pub fn socket_inode(target: &str) -> Option<u64> {
    target
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

fn classify(pid: u32, err: &io::Error) -> DetailError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => DetailError::AccessDenied(pid),
        _ => DetailError::Vanished(pid),
    }
}

/// Reads thread and connection counts for one process.
///
/// `inet_inodes` is the set of inet socket inodes from /proc/net; fds
/// pointing at other socket families (unix, netlink) are not counted.
pub fn read_detail(
    proc_root: &Path,
    pid: u32,
    inet_inodes: &HashSet<u64>,
) -> Result<ProcessDetail, DetailError> {
    let base = proc_root.join(pid.to_string());

    let status = fs::read_to_string(base.join("status")).map_err(|e| classify(pid, &e))?;
    let status = parse_status(&status);
    if status.state == Some('Z') {
        return Err(DetailError::Zombie(pid));
    }

    let fds = fs::read_dir(base.join("fd")).map_err(|e| classify(pid, &e))?;
    let connections = fds
        .flatten()
        .filter_map(|fd| fs::read_link(fd.path()).ok())
        .filter_map(|target| socket_inode(&target.to_string_lossy()))
        .filter(|inode| inet_inodes.contains(inode))
        .count();

    Ok(ProcessDetail {
        num_threads: status.threads,
        connections,
    })
}
