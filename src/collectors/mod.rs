//! Collectors module for host metrics.
//!
//! Readers for the data sysinfo does not cover: filesystem usage, extended
//! memory counters, network interface statistics, hardware sensors and
//! logged-in sessions.

pub mod filesystem;
pub mod meminfo;
pub mod netdev;
pub mod sensors;
pub mod sessions;
