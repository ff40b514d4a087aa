//! Disk I/O statistics collector.
//!
//! Takes one snapshot of all block devices and emits the cumulative bytes
//! read and written since each device attached. Devices that never moved a
//! byte are suppressed.

use std::fmt::Write as _;

use super::{CollectError, Collection};
use crate::render;

/// Identity of a device inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Raw driver name as reported by the kernel.
    pub name: Vec<u8>,
    pub unit: Option<i32>,
}

impl DeviceEntry {
    pub fn new(name: impl Into<Vec<u8>>, unit: Option<i32>) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }

    /// Builds the unique identifier `<name><unit>`, e.g. `ada0`.
    pub fn identifier(&self) -> Result<String, CollectError> {
        let name = std::str::from_utf8(&self.name).map_err(|e| {
            CollectError::Format(format!("{}: {}", String::from_utf8_lossy(&self.name), e))
        })?;
        if name.is_empty() {
            return Err(CollectError::Format("empty device name".to_string()));
        }

        let mut id = String::with_capacity(name.len() + 4);
        id.push_str(name);
        if let Some(unit) = self.unit {
            write!(id, "{}", unit)
                .map_err(|e| CollectError::Format(e.to_string()))?;
        }
        Ok(id)
    }
}

/// Statistics computed for one device.
///
/// Only the byte counters are exported; the remaining figures are computed
/// alongside them by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStatistics {
    pub total_bytes: u64,
    pub total_bytes_read: u64,
    pub total_bytes_write: u64,
    pub total_transfers: u64,
    pub total_transfers_read: u64,
    pub total_transfers_write: u64,
    pub total_blocks: u64,
    pub queue_length: u64,
}

/// A point-in-time copy of the device statistics table.
pub trait DeviceSnapshot {
    fn devices(&self) -> &[DeviceEntry];

    fn compute_statistics(&self, index: usize) -> Result<DeviceStatistics, CollectError>;
}

pub trait DeviceStatsSource {
    fn snapshot(&self) -> Result<Box<dyn DeviceSnapshot + '_>, CollectError>;
}

pub fn collect(source: &dyn DeviceStatsSource) -> Result<Collection, CollectError> {
    let snapshot = source.snapshot()?;
    let mut collection = Collection::default();

    for (index, device) in snapshot.devices().iter().enumerate() {
        let id = match device.identifier() {
            Ok(id) => id,
            Err(e) => {
                collection.skip(e);
                continue;
            }
        };

        let stats = match snapshot.compute_statistics(index) {
            Ok(stats) => stats,
            Err(e) => {
                collection.skip(e);
                continue;
            }
        };

        if stats.total_bytes_read > 0 || stats.total_bytes_write > 0 {
            collection.push(render::device_io(
                &id,
                stats.total_bytes_read,
                stats.total_bytes_write,
            ));
        }
    }

    Ok(collection)
}
