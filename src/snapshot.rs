//! Host snapshot assembly.
//!
//! A [`HostSnapshot`] is the record the registration loop upserts each cycle.
//! Readings come from a [`HostProbe`]; partition failures are absorbed here and
//! never surface past [`SnapshotBuilder::build`].

use crate::collectors::filesystem::{read_partitions, DiskTotals, PartitionReading};
use crate::format::{round2, GIB};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::System;
use tracing::{debug, instrument};

/// One point-in-time record of a host's vitals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub ip: String,
    pub hostname: String,
    pub access_port: u16,
    pub cpu_percent: f64,
    pub cpu_count_physical: u32,
    pub memory_percent: f64,
    pub memory_total_gib: f64,
    pub disk_usage_percent: f64,
    /// Capture time, milliseconds since epoch.
    pub timestamp_ms: i64,
}

/// Values that stay fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub ip: String,
    pub hostname: String,
    pub access_port: u16,
}

/// Source of raw host readings.
#[async_trait]
pub trait HostProbe: Send {
    /// Overall CPU utilization over the sample window, 0-100.
    async fn cpu_percent(&mut self, window: Duration) -> f64;

    fn physical_core_count(&self) -> u32;

    /// Total memory in bytes and used percentage.
    fn memory(&mut self) -> (u64, f64);

    fn partitions(&self) -> Vec<PartitionReading>;
}

/// [`HostProbe`] backed by sysinfo and /proc.
pub struct SystemProbe {
    system: System,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

#[async_trait]
impl HostProbe for SystemProbe {
    async fn cpu_percent(&mut self, window: Duration) -> f64 {
        self.system.refresh_cpu();
        tokio::time::sleep(window).await;
        self.system.refresh_cpu();
        f64::from(self.system.global_cpu_info().cpu_usage())
    }

    fn physical_core_count(&self) -> u32 {
        self.system
            .physical_core_count()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    }

    fn memory(&mut self) -> (u64, f64) {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let available = self.system.available_memory();
        let percent = if total == 0 {
            0.0
        } else {
            total.saturating_sub(available) as f64 / total as f64 * 100.0
        };
        (total, percent)
    }

    fn partitions(&self) -> Vec<PartitionReading> {
        read_partitions()
    }
}

/// Composes probe readings into snapshots.
pub struct SnapshotBuilder<P> {
    probe: P,
    identity: HostIdentity,
    sample_window: Duration,
    primed: bool,
}

impl<P: HostProbe> SnapshotBuilder<P> {
    pub fn new(probe: P, identity: HostIdentity, sample_window: Duration) -> Self {
        Self {
            probe,
            identity,
            sample_window,
            primed: false,
        }
    }

    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Takes and discards the first CPU sample.
    ///
    /// The first utilization reading of a process has no baseline and is
    /// meaningless; it must not end up in a stored snapshot.
    #[instrument(skip(self))]
    pub async fn prime(&mut self) {
        let discarded = self.probe.cpu_percent(self.sample_window).await;
        debug!("Discarded priming CPU sample of {:.2}%", discarded);
        self.primed = true;
    }

    /// Builds a fresh snapshot. Never fails.
    pub async fn build(&mut self) -> HostSnapshot {
        if !self.primed {
            self.prime().await;
        }

        let cpu_percent = self.probe.cpu_percent(self.sample_window).await;
        let (memory_total, memory_percent) = self.probe.memory();
        let disk = DiskTotals::from_readings(&self.probe.partitions());

        HostSnapshot {
            ip: self.identity.ip.clone(),
            hostname: self.identity.hostname.clone(),
            access_port: self.identity.access_port,
            cpu_percent,
            cpu_count_physical: self.probe.physical_core_count(),
            memory_percent,
            memory_total_gib: memory_total as f64 / GIB,
            disk_usage_percent: round2(disk.used_percent()),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::filesystem::{DiskUsage, MountEntry};
    use std::io;

    struct FixedProbe {
        cpu_samples: Vec<f64>,
        calls: usize,
    }

    fn mount(point: &str) -> MountEntry {
        MountEntry {
            device: "/dev/vda1".into(),
            mount_point: point.into(),
            fstype: "ext4".into(),
        }
    }

    #[async_trait]
    impl HostProbe for FixedProbe {
        async fn cpu_percent(&mut self, _window: Duration) -> f64 {
            let value = self.cpu_samples[self.calls.min(self.cpu_samples.len() - 1)];
            self.calls += 1;
            value
        }

        fn physical_core_count(&self) -> u32 {
            4
        }

        fn memory(&mut self) -> (u64, f64) {
            (8 * 1024 * 1024 * 1024, 25.0)
        }

        fn partitions(&self) -> Vec<PartitionReading> {
            vec![
                PartitionReading {
                    mount: mount("/"),
                    usage: Ok(DiskUsage {
                        total_bytes: 100,
                        used_bytes: 50,
                        free_bytes: 50,
                    }),
                },
                PartitionReading {
                    mount: mount("/root-only"),
                    usage: Err(io::Error::from(io::ErrorKind::PermissionDenied)),
                },
                PartitionReading {
                    mount: mount("/data"),
                    usage: Ok(DiskUsage {
                        total_bytes: 200,
                        used_bytes: 50,
                        free_bytes: 150,
                    }),
                },
            ]
        }
    }

    fn identity() -> HostIdentity {
        HostIdentity {
            ip: "10.0.0.7".into(),
            hostname: "node-7".into(),
            access_port: 8000,
        }
    }

    #[tokio::test]
    async fn test_build_discards_priming_sample() {
        let probe = FixedProbe {
            cpu_samples: vec![0.0, 42.5],
            calls: 0,
        };
        let mut builder = SnapshotBuilder::new(probe, identity(), Duration::from_millis(1));
        builder.prime().await;
        assert!(builder.is_primed());

        let snapshot = builder.build().await;
        assert_eq!(snapshot.cpu_percent, 42.5);
        assert_eq!(snapshot.ip, "10.0.0.7");
        assert_eq!(snapshot.cpu_count_physical, 4);
        assert_eq!(snapshot.memory_total_gib, 8.0);
        assert_eq!(snapshot.memory_percent, 25.0);
        assert_eq!(snapshot.disk_usage_percent, 33.33);
        assert!(snapshot.timestamp_ms > 0);
    }

    #[tokio::test]
    async fn test_build_primes_when_not_primed() {
        let probe = FixedProbe {
            cpu_samples: vec![99.0, 12.0],
            calls: 0,
        };
        let mut builder = SnapshotBuilder::new(probe, identity(), Duration::from_millis(1));
        let snapshot = builder.build().await;
        assert_eq!(snapshot.cpu_percent, 12.0);
    }
}
