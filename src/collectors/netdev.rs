//! Network interface statistics collector.
//!
//! This module reads per-interface counters from /proc/net/dev, interface
//! flags from /sys/class/net, and counts open inet sockets from /proc/net.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

const NETDEV_PATH: &str = "/proc/net/dev";
const SYS_CLASS_NET: &str = "/sys/class/net";
const INET_SOCKET_TABLES: [&str; 4] = [
    "/proc/net/tcp",
    "/proc/net/tcp6",
    "/proc/net/udp",
    "/proc/net/udp6",
];

/// Network interface statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetDevStats {
    pub receive_bytes: u64,
    pub receive_packets: u64,
    pub receive_errs: u64,
    pub receive_drop: u64,
    pub transmit_bytes: u64,
    pub transmit_packets: u64,
    pub transmit_errs: u64,
    pub transmit_drop: u64,
}

impl NetDevStats {
    /// Adds another interface's counters into this one.
    pub fn accumulate(&mut self, other: &NetDevStats) {
        self.receive_bytes += other.receive_bytes;
        self.receive_packets += other.receive_packets;
        self.receive_errs += other.receive_errs;
        self.receive_drop += other.receive_drop;
        self.transmit_bytes += other.transmit_bytes;
        self.transmit_packets += other.transmit_packets;
        self.transmit_errs += other.transmit_errs;
        self.transmit_drop += other.transmit_drop;
    }
}

/// Link state of an interface as exposed by sysfs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceFlags {
    pub is_up: bool,
    pub mtu: u32,
    /// Link speed in Mbit/s, 0 when unknown.
    pub speed_mbps: u32,
}

/// Reads network interface statistics from /proc/net/dev.
///
/// Returns a map from interface name to its statistics.
pub fn read_netdev_stats() -> Result<BTreeMap<String, NetDevStats>, String> {
    let content = fs::read_to_string(NETDEV_PATH)
        .map_err(|e| format!("Failed to read {}: {}", NETDEV_PATH, e))?;
    Ok(parse_netdev(&content))
}

/// Parses /proc/net/dev content.
pub fn parse_netdev(content: &str) -> BTreeMap<String, NetDevStats> {
    let mut stats = BTreeMap::new();

    // Skip the two header lines
    for line in content.lines().skip(2) {
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = counters
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if values.len() < 16 {
            continue; // Skip malformed lines
        }

        stats.insert(
            interface.trim().to_string(),
            NetDevStats {
                receive_bytes: values[0],
                receive_packets: values[1],
                receive_errs: values[2],
                receive_drop: values[3],
                transmit_bytes: values[8],
                transmit_packets: values[9],
                transmit_errs: values[10],
                transmit_drop: values[11],
            },
        );
    }

    stats
}

/// Reads operstate, mtu and speed for an interface.
///
/// Unreadable attributes fall back to their defaults; virtual interfaces
/// commonly reject reads of `speed`.
pub fn read_interface_flags(interface: &str) -> InterfaceFlags {
    let base = Path::new(SYS_CLASS_NET).join(interface);
    let read = |attr: &str| {
        fs::read_to_string(base.join(attr))
            .map(|s| s.trim().to_string())
            .ok()
    };

    let is_up = match read("operstate").as_deref() {
        Some("up") => true,
        // Loopback reports "unknown" while being usable
        Some("unknown") => read("flags")
            .and_then(|f| u32::from_str_radix(f.trim_start_matches("0x"), 16).ok())
            .is_some_and(|flags| flags & 0x1 != 0),
        _ => false,
    };

    InterfaceFlags {
        is_up,
        mtu: read("mtu").and_then(|v| v.parse().ok()).unwrap_or(0),
        speed_mbps: read("speed")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0),
    }
}

/// Counts inet (tcp/udp, v4/v6) sockets listed in /proc/net.
pub fn count_inet_sockets() -> usize {
    INET_SOCKET_TABLES
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .map(|content| count_socket_table_entries(&content))
        .sum()
}

/// Counts entries in a /proc/net/{tcp,udp}* table (header excluded).
pub fn count_socket_table_entries(content: &str) -> usize {
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count()
}

/// Socket inodes of every inet socket currently listed in /proc/net.
pub fn inet_socket_inodes() -> HashSet<u64> {
    INET_SOCKET_TABLES
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .flat_map(|content| parse_socket_inodes(&content))
        .collect()
}

/// Extracts the inode column (10th field) from a socket table.
pub fn parse_socket_inodes(content: &str) -> Vec<u64> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(9)?.parse().ok())
        .filter(|inode| *inode != 0)
        .collect()
}
