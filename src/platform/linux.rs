//! Linux sources backed by /proc, statvfs and getifaddrs.
//!
//! Kept so the exporter runs on development hosts. Counters are mapped onto
//! the FreeBSD metric families as closely as /proc allows.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use nix::sys::socket::{AddressFamily as SockFamily, SockaddrLike};
use nix::unistd::{sysconf, SysconfVar};

use crate::collectors::{
    AddressFamily, CollectError, DeviceEntry, DeviceSnapshot, DeviceStatistics,
    DeviceStatsSource, FilesystemEntry, FilesystemSource, InterfaceAddress, InterfaceCounters,
    InterfaceSource, LoadAverage, LoadAverageSource, MemorySource, MountedFilesystem, PageCounter,
    SwapUsage,
};

const SECTOR_SIZE: u64 = 512;

/// Kernel interfaces of the running Linux host.
#[derive(Debug, Clone)]
pub struct Host {
    proc_root: PathBuf,
}

impl Host {
    pub fn open() -> Self {
        Self::with_proc_root("/proc")
    }

    /// Reads /proc style files below `proc_root` instead of `/proc`.
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn read(&self, name: &str) -> Result<String, CollectError> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path).map_err(|source| CollectError::Query {
            what: format!("Reading {}", path.display()),
            source,
        })
    }

    fn meminfo(&self) -> Result<HashMap<String, u64>, CollectError> {
        Ok(parse_meminfo(&self.read("meminfo")?))
    }

    fn meminfo_kb(&self, field: &str) -> Result<u64, CollectError> {
        self.meminfo()?
            .get(field)
            .copied()
            .ok_or_else(|| CollectError::parse("/proc/meminfo", format!("{} not found", field)))
    }
}

impl FilesystemSource for Host {
    fn mounted_filesystems(&self) -> Result<Vec<MountedFilesystem>, CollectError> {
        let mounts_path = self.proc_root.join("mounts");
        let content =
            fs::read_to_string(&mounts_path).map_err(|source| CollectError::Enumeration {
                what: "mounted filesystems",
                source,
            })?;

        Ok(parse_mounts(&content)
            .into_iter()
            .filter(|(_, mount_point, fstype)| !should_skip_filesystem(fstype, mount_point))
            .map(|(device, mount_point, fstype)| {
                let stat = nix::sys::statvfs::statvfs(Path::new(&mount_point)).map_err(|e| {
                    CollectError::Query {
                        what: format!("statvfs {}", mount_point),
                        source: e.into(),
                    }
                })?;
                Ok(FilesystemEntry {
                    device,
                    fstype,
                    mount_point,
                    blocks: stat.blocks() as u64,
                    block_size: stat.fragment_size() as u64,
                    free_blocks: stat.blocks_free() as u64,
                    available_blocks: i64::try_from(stat.blocks_available() as u64)
                        .unwrap_or(i64::MAX),
                })
            })
            .collect())
    }
}

impl LoadAverageSource for Host {
    fn load_average(&self) -> Result<LoadAverage, CollectError> {
        parse_loadavg(&self.read("loadavg")?)
    }
}

impl InterfaceSource for Host {
    fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>, CollectError> {
        let counters = parse_net_dev(&self.read("net/dev")?);
        let ifaddrs = nix::ifaddrs::getifaddrs().map_err(|e| CollectError::Enumeration {
            what: "network interfaces",
            source: e.into(),
        })?;

        let addresses = ifaddrs
            .map(|ifa| {
                let family = ifa.address.as_ref().map(|addr| match addr.family() {
                    Some(SockFamily::Packet) => AddressFamily::Link,
                    Some(SockFamily::Inet) => AddressFamily::Inet,
                    Some(SockFamily::Inet6) => AddressFamily::Inet6,
                    _ => AddressFamily::Other,
                });
                let counters = match family {
                    Some(AddressFamily::Link) => counters.get(&ifa.interface_name).copied(),
                    _ => None,
                };

                InterfaceAddress {
                    up: ifa.flags.contains(nix::net::if_::InterfaceFlags::IFF_UP),
                    name: ifa.interface_name,
                    family,
                    counters,
                }
            })
            .collect();

        Ok(addresses)
    }
}

impl MemorySource for Host {
    fn page_size(&self) -> Result<u64, CollectError> {
        match sysconf(SysconfVar::PAGE_SIZE) {
            Ok(Some(size)) if size > 0 => Ok(size as u64),
            Ok(_) => Err(CollectError::Unsupported("sysconf(PAGE_SIZE)")),
            Err(e) => Err(CollectError::Query {
                what: "sysconf(PAGE_SIZE)".to_string(),
                source: e.into(),
            }),
        }
    }

    fn buffer_space(&self) -> Result<u64, CollectError> {
        Ok(self.meminfo_kb("Buffers")? * 1024)
    }

    fn page_count(&self, counter: PageCounter) -> Result<u64, CollectError> {
        let field = match counter {
            PageCounter::Total => "MemTotal",
            PageCounter::Active => "Active",
            PageCounter::Inactive => "Inactive",
            PageCounter::Laundry => "Dirty",
            PageCounter::Wired => "Unevictable",
            PageCounter::Free => "MemFree",
        };
        Ok(self.meminfo_kb(field)? * 1024 / self.page_size()?)
    }

    fn swap_usage(&self) -> Result<SwapUsage, CollectError> {
        let info = self.meminfo()?;
        let page_size = self.page_size()?;
        let field = |name: &str| {
            info.get(name)
                .copied()
                .ok_or_else(|| CollectError::parse("/proc/meminfo", format!("{} not found", name)))
        };

        let total_pages = field("SwapTotal")? * 1024 / page_size;
        let free_pages = field("SwapFree")? * 1024 / page_size;
        Ok(SwapUsage {
            total_pages,
            used_pages: total_pages.saturating_sub(free_pages),
        })
    }

    fn swap_max_pages(&self) -> Result<u64, CollectError> {
        // Linux has no allocatable-swap ceiling below the device total.
        Ok(u64::MAX)
    }
}

/// /proc/diskstats as read once.
struct DiskstatsSnapshot {
    devices: Vec<DeviceEntry>,
    stats: Vec<DeviceStatistics>,
}

impl DeviceSnapshot for DiskstatsSnapshot {
    fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    fn compute_statistics(&self, index: usize) -> Result<DeviceStatistics, CollectError> {
        self.stats
            .get(index)
            .copied()
            .ok_or_else(|| CollectError::Inconsistent(format!("device #{}", index)))
    }
}

impl DeviceStatsSource for Host {
    fn snapshot(&self) -> Result<Box<dyn DeviceSnapshot + '_>, CollectError> {
        let path = self.proc_root.join("diskstats");
        let content = fs::read_to_string(&path).map_err(|source| CollectError::Enumeration {
            what: "block devices",
            source,
        })?;

        let (devices, stats) = parse_diskstats(&content).into_iter().unzip();
        Ok(Box::new(DiskstatsSnapshot { devices, stats }))
    }
}

/// Splits /proc/mounts into (device, mount point, fstype) triples.
fn parse_mounts(content: &str) -> Vec<(String, String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            Some((
                unescape_mount_field(parts[0]),
                unescape_mount_field(parts[1]),
                parts[2].to_string(),
            ))
        })
        .collect()
}

/// Decodes the `\ooo` octal escapes the kernel uses for blanks in mount fields.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap_or("");
            if let Ok(value) = u8::from_str_radix(digits, 8) {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Checks if a filesystem should be skipped based on type and mount point.
fn should_skip_filesystem(fstype: &str, mount_point: &str) -> bool {
    // Skip pseudo/virtual filesystems
    let skip_types = [
        "proc",
        "sysfs",
        "devpts",
        "devtmpfs",
        "tmpfs",
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
    ];

    if skip_types.contains(&fstype) {
        return true;
    }

    mount_point.starts_with("/proc")
        || mount_point.starts_with("/sys")
        || mount_point.starts_with("/dev")
        || mount_point.starts_with("/run")
}

/// Format: "0.00 0.01 0.05 1/234 5678"
fn parse_loadavg(content: &str) -> Result<LoadAverage, CollectError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(CollectError::parse(
            "/proc/loadavg",
            format!("expected at least 3 fields, got {}", parts.len()),
        ));
    }

    let field = |idx: usize, window: &str| {
        parts[idx]
            .parse::<f64>()
            .map_err(|e| CollectError::parse(format!("{} load average", window), e))
    };

    Ok(LoadAverage {
        one_min: field(0, "1min")?,
        five_min: field(1, "5min")?,
        fifteen_min: field(2, "15min")?,
    })
}

/// Maps interface names to counters from /proc/net/dev.
fn parse_net_dev(content: &str) -> HashMap<String, InterfaceCounters> {
    let mut stats = HashMap::new();

    // Skip the two header lines
    for line in content.lines().skip(2) {
        let Some((interface, values)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = values
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if values.len() < 16 {
            continue;
        }

        stats.insert(
            interface.trim().to_string(),
            InterfaceCounters {
                rx_bytes: values[0],
                rx_errors: values[2],
                tx_bytes: values[8],
                tx_errors: values[10],
            },
        );
    }

    stats
}

/// Parses "Key:   value kB" lines into kilobyte values.
fn parse_meminfo(content: &str) -> HashMap<String, u64> {
    content
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim().to_string(), value))
        })
        .collect()
}

/// Format: major minor name read_ios read_merges read_sectors read_ticks
/// write_ios write_merges write_sectors write_ticks ios_in_progress ...
fn parse_diskstats(content: &str) -> Vec<(DeviceEntry, DeviceStatistics)> {
    let mut devices = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }

        let device = parts[2];
        if device.starts_with("loop") || device.starts_with("ram") {
            continue;
        }

        let field = |idx: usize| parts[idx].parse::<u64>().unwrap_or(0);
        let reads = field(3);
        let bytes_read = field(5) * SECTOR_SIZE;
        let writes = field(7);
        let bytes_written = field(9) * SECTOR_SIZE;

        let stats = DeviceStatistics {
            total_bytes: bytes_read + bytes_written,
            total_bytes_read: bytes_read,
            total_bytes_write: bytes_written,
            total_transfers: reads + writes,
            total_transfers_read: reads,
            total_transfers_write: writes,
            total_blocks: (bytes_read + bytes_written) / SECTOR_SIZE,
            queue_length: field(11),
        };

        devices.push((split_device_name(device), stats));
    }

    devices
}

/// "nvme0n1" -> ("nvme0n", 1), "sda" -> ("sda", None)
fn split_device_name(device: &str) -> DeviceEntry {
    let base = device.trim_end_matches(|c: char| c.is_ascii_digit());
    let unit = device[base.len()..].parse().ok();
    if base.is_empty() || unit.is_none() {
        return DeviceEntry::new(device, None);
    }
    DeviceEntry::new(base, unit)
}
