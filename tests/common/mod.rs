//! In-memory kernel sources shared by the integration tests.

#![allow(dead_code)]

use std::io;

use freebsd_exporter::collectors::{
    AddressFamily, CollectError, DeviceEntry, DeviceSnapshot, DeviceStatistics,
    DeviceStatsSource, FilesystemEntry, FilesystemSource, InterfaceAddress, InterfaceCounters,
    InterfaceSource, LoadAverage, LoadAverageSource, MemorySource, MountedFilesystem, PageCounter,
    SwapUsage,
};

/// A host whose every counter is fixed up front.
#[derive(Debug, Clone)]
pub struct FakeHost {
    pub mounts: Option<Vec<FilesystemEntry>>,
    pub load: Option<LoadAverage>,
    pub interfaces: Option<Vec<InterfaceAddress>>,
    pub page_size: u64,
    pub swap: SwapUsage,
    pub swap_max_pages: u64,
    pub devices: Option<Vec<(DeviceEntry, DeviceStatistics)>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            mounts: Some(vec![root_fs()]),
            load: Some(LoadAverage {
                one_min: 0.50,
                five_min: 0.75,
                fifteen_min: 1.00,
            }),
            interfaces: Some(vec![
                InterfaceAddress {
                    name: "em0".to_string(),
                    family: Some(AddressFamily::Inet),
                    up: true,
                    counters: None,
                },
                InterfaceAddress {
                    name: "em0".to_string(),
                    family: Some(AddressFamily::Link),
                    up: true,
                    counters: Some(InterfaceCounters {
                        rx_bytes: 1000,
                        tx_bytes: 2000,
                        rx_errors: 1,
                        tx_errors: 2,
                    }),
                },
            ]),
            page_size: 4096,
            swap: SwapUsage {
                total_pages: 512,
                used_pages: 128,
            },
            swap_max_pages: 256,
            devices: Some(vec![
                (
                    DeviceEntry::new("ada", Some(0)),
                    DeviceStatistics {
                        total_bytes: 3072,
                        total_bytes_read: 1024,
                        total_bytes_write: 2048,
                        ..DeviceStatistics::default()
                    },
                ),
                (DeviceEntry::new("cd", Some(0)), DeviceStatistics::default()),
            ]),
        }
    }
}

pub fn root_fs() -> FilesystemEntry {
    FilesystemEntry {
        device: "/dev/ada0p2".to_string(),
        fstype: "ufs".to_string(),
        mount_point: "/".to_string(),
        blocks: 1000,
        block_size: 512,
        free_blocks: 200,
        available_blocks: 150,
    }
}

fn unavailable(what: &'static str) -> CollectError {
    CollectError::Enumeration {
        what,
        source: io::Error::from_raw_os_error(libc::EIO),
    }
}

impl FilesystemSource for FakeHost {
    fn mounted_filesystems(&self) -> Result<Vec<MountedFilesystem>, CollectError> {
        self.mounts
            .as_ref()
            .map(|mounts| mounts.iter().cloned().map(Ok).collect())
            .ok_or_else(|| unavailable("mounted filesystems"))
    }
}

impl LoadAverageSource for FakeHost {
    fn load_average(&self) -> Result<LoadAverage, CollectError> {
        self.load.ok_or(CollectError::Unsupported("load average"))
    }
}

impl InterfaceSource for FakeHost {
    fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>, CollectError> {
        self.interfaces
            .clone()
            .ok_or_else(|| unavailable("network interfaces"))
    }
}

impl MemorySource for FakeHost {
    fn page_size(&self) -> Result<u64, CollectError> {
        Ok(self.page_size)
    }

    fn buffer_space(&self) -> Result<u64, CollectError> {
        Ok(65536)
    }

    fn page_count(&self, counter: PageCounter) -> Result<u64, CollectError> {
        Ok(match counter {
            PageCounter::Total => 1000,
            PageCounter::Active => 400,
            PageCounter::Inactive => 300,
            PageCounter::Laundry => 0,
            PageCounter::Wired => 200,
            PageCounter::Free => 100,
        })
    }

    fn swap_usage(&self) -> Result<SwapUsage, CollectError> {
        Ok(self.swap)
    }

    fn swap_max_pages(&self) -> Result<u64, CollectError> {
        Ok(self.swap_max_pages)
    }
}

struct FakeSnapshot(Vec<(DeviceEntry, DeviceStatistics)>, Vec<DeviceEntry>);

impl DeviceSnapshot for FakeSnapshot {
    fn devices(&self) -> &[DeviceEntry] {
        &self.1
    }

    fn compute_statistics(&self, index: usize) -> Result<DeviceStatistics, CollectError> {
        Ok(self.0[index].1)
    }
}

impl DeviceStatsSource for FakeHost {
    fn snapshot(&self) -> Result<Box<dyn DeviceSnapshot + '_>, CollectError> {
        let devices = self
            .devices
            .clone()
            .ok_or_else(|| CollectError::Allocation("device info".to_string()))?;
        let entries = devices.iter().map(|(entry, _)| entry.clone()).collect();
        Ok(Box::new(FakeSnapshot(devices, entries)))
    }
}
