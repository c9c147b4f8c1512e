//! Filesystem statistics collector.
//!
//! This module enumerates mounted partitions from /proc/mounts, reads their
//! usage with libc statvfs, and aggregates capacity across partitions.

use std::ffi::CString;
use std::fs;
use std::io;
use tracing::debug;

const MOUNTS_PATH: &str = "/proc/mounts";

/// Pseudo/virtual filesystems that carry no disk capacity.
const SKIP_FSTYPES: [&str; 24] = [
    "proc",
    "sysfs",
    "devpts",
    "devtmpfs",
    "tmpfs",
    "ramfs",
    "cgroup",
    "cgroup2",
    "pstore",
    "bpf",
    "debugfs",
    "tracefs",
    "fusectl",
    "configfs",
    "securityfs",
    "hugetlbfs",
    "mqueue",
    "autofs",
    "binfmt_misc",
    "nsfs",
    "overlay",
    "rpc_pipefs",
    "efivarfs",
    "fuse.portal",
];

/// One line of /proc/mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
}

/// Usage triple of a partition, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

impl DiskUsage {
    pub fn used_percent(&self) -> f64 {
        percent_of(self.used_bytes, self.total_bytes)
    }
}

/// A partition together with the outcome of reading its usage.
#[derive(Debug)]
pub struct PartitionReading {
    pub mount: MountEntry,
    pub usage: io::Result<DiskUsage>,
}

/// Capacity summed across readable partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskTotals {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub partitions: usize,
}

impl DiskTotals {
    /// Sums usage triples. The resulting percentage is capacity weighted.
    pub fn aggregate<'a, I>(usages: I) -> Self
    where
        I: IntoIterator<Item = &'a DiskUsage>,
    {
        usages
            .into_iter()
            .fold(DiskTotals::default(), |mut acc, usage| {
                acc.total_bytes += usage.total_bytes;
                acc.used_bytes += usage.used_bytes;
                acc.free_bytes += usage.free_bytes;
                acc.partitions += 1;
                acc
            })
    }

    /// Aggregates only the partitions whose usage could be read.
    pub fn from_readings(readings: &[PartitionReading]) -> Self {
        Self::aggregate(readable(readings).map(|(_, usage)| usage))
    }

    /// `used / total * 100`, or 0.0 when nothing was readable.
    pub fn used_percent(&self) -> f64 {
        percent_of(self.used_bytes, self.total_bytes)
    }

    /// `free / total * 100`, or 0.0 when nothing was readable.
    pub fn free_percent(&self) -> f64 {
        percent_of(self.free_bytes, self.total_bytes)
    }
}

fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Iterates readable partitions, skipping (and logging) failed reads.
pub fn readable(
    readings: &[PartitionReading],
) -> impl Iterator<Item = (&MountEntry, &DiskUsage)> {
    readings.iter().filter_map(|r| match &r.usage {
        Ok(usage) => Some((&r.mount, usage)),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!("Skipping restricted partition {}", r.mount.mount_point);
            None
        }
        Err(e) => {
            debug!(
                "Skipping partition {}: {}",
                r.mount.mount_point, e
            );
            None
        }
    })
}

/// Reads every physical partition and its usage.
///
/// A missing /proc/mounts yields no partitions rather than an error.
pub fn read_partitions() -> Vec<PartitionReading> {
    let content = match fs::read_to_string(MOUNTS_PATH) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to read {}: {}", MOUNTS_PATH, e);
            return Vec::new();
        }
    };

    parse_mounts(&content)
        .into_iter()
        .map(|mount| {
            let usage = statvfs_usage(&mount.mount_point);
            PartitionReading { mount, usage }
        })
        .collect()
}

/// Parses /proc/mounts content, dropping pseudo filesystems.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }

            let entry = MountEntry {
                device: unescape_mount_field(parts[0]),
                mount_point: unescape_mount_field(parts[1]),
                fstype: parts[2].to_string(),
            };

            if should_skip_filesystem(&entry.fstype, &entry.mount_point) {
                None
            } else {
                Some(entry)
            }
        })
        .collect()
}

/// Checks if a filesystem should be skipped based on type and mount point.
fn should_skip_filesystem(fstype: &str, mount_point: &str) -> bool {
    if SKIP_FSTYPES.contains(&fstype) {
        return true;
    }

    mount_point.starts_with("/proc")
        || mount_point.starts_with("/sys")
        || mount_point.starts_with("/dev")
        || mount_point.starts_with("/run")
}

/// Decodes the octal escapes (`\040` for space, ...) used in /proc/mounts.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits.iter().fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Gets partition usage using libc statvfs.
fn statvfs_usage(path: &str) -> io::Result<DiskUsage> {
    let c_path = CString::new(path).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: statvfs only writes into the zeroed struct we own.
    let stat = unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(io::Error::last_os_error());
        }
        stat
    };

    let block_size = stat.f_frsize as u64;
    let total_bytes = block_size * stat.f_blocks as u64;
    let free_bytes = block_size * stat.f_bavail as u64;
    let used_bytes = total_bytes.saturating_sub(block_size * stat.f_bfree as u64);

    Ok(DiskUsage {
        total_bytes,
        used_bytes,
        free_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(total: u64, used: u64) -> DiskUsage {
        DiskUsage {
            total_bytes: total,
            used_bytes: used,
            free_bytes: total - used,
        }
    }

    fn reading(mount_point: &str, usage: io::Result<DiskUsage>) -> PartitionReading {
        PartitionReading {
            mount: MountEntry {
                device: "/dev/sda1".into(),
                mount_point: mount_point.into(),
                fstype: "ext4".into(),
            },
            usage,
        }
    }

    #[test]
    fn test_aggregate_is_capacity_weighted() {
        let totals = DiskTotals::aggregate(&[usage(100, 50), usage(200, 50)]);
        assert_eq!(totals.total_bytes, 300);
        assert_eq!(totals.used_bytes, 100);
        assert_eq!(totals.partitions, 2);
        assert!((totals.used_percent() - 33.333_333).abs() < 1e-4);
    }

    #[test]
    fn test_aggregate_empty_is_zero_percent() {
        let totals = DiskTotals::aggregate(&[]);
        assert_eq!(totals.used_percent(), 0.0);
        assert_eq!(totals.free_percent(), 0.0);
    }

    #[test]
    fn test_from_readings_skips_failures() {
        let readings = vec![
            reading("/", Ok(usage(100, 50))),
            reading(
                "/secret",
                Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            ),
            reading("/gone", Err(io::Error::from(io::ErrorKind::NotFound))),
            reading("/data", Ok(usage(200, 50))),
        ];
        let totals = DiskTotals::from_readings(&readings);
        assert_eq!(totals.partitions, 2);
        assert_eq!(totals.total_bytes, 300);
    }

    #[test]
    fn test_from_readings_all_denied() {
        let readings = vec![reading(
            "/",
            Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        )];
        assert_eq!(DiskTotals::from_readings(&readings).used_percent(), 0.0);
    }

    #[test]
    fn test_parse_mounts_skips_pseudo() {
        let content = "\
sysfs /sys sysfs rw,nosuid 0 0
proc /proc proc rw 0 0
/dev/sda1 / ext4 rw,relatime 0 0
tmpfs /run tmpfs rw 0 0
/dev/sdb1 /mnt/my\\040disk xfs rw 0 0
broken-line
";
        let mounts = parse_mounts(content);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].mount_point, "/");
        assert_eq!(mounts[0].fstype, "ext4");
        assert_eq!(mounts[1].mount_point, "/mnt/my disk");
    }

    #[test]
    fn test_should_skip_filesystem() {
        assert!(should_skip_filesystem("proc", "/proc"));
        assert!(should_skip_filesystem("sysfs", "/sys"));
        assert!(should_skip_filesystem("tmpfs", "/dev/shm"));
        assert!(!should_skip_filesystem("ext4", "/"));
        assert!(!should_skip_filesystem("xfs", "/data"));
    }

    #[test]
    fn test_statvfs_root() {
        let usage = statvfs_usage("/").expect("statvfs on / should succeed");
        assert!(usage.total_bytes > 0);
        assert!(usage.used_bytes <= usage.total_bytes);
    }
}
