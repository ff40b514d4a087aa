//! Collectors module for system metrics.
//!
//! Each collector queries one kernel subsystem through a small source trait
//! and normalizes the result into [`Metric`] records. Collectors never print
//! or log; they return a [`Collection`] (records plus the items that had to
//! be skipped) or a [`CollectError`] when nothing could be gathered at all.

pub mod diskstats;
pub mod filesystem;
pub mod loadavg;
pub mod memory;
pub mod netdev;

use std::fmt;
use std::io;

use crate::metric::Metric;

/// Failures raised while querying the kernel.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("{what} failed: {source}")]
    Query {
        what: String,
        #[source]
        source: io::Error,
    },

    #[error("{what}: value length invalid (expected {expected} bytes, got {actual})")]
    Length {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Could not allocate memory for {0}")]
    Allocation(String),

    #[error("Could not format device name: {0}")]
    Format(String),

    #[error("Could not enumerate {what}: {source}")]
    Enumeration {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Statistics for {0} changed while being read")]
    Inconsistent(String),

    #[error("Could not parse {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl CollectError {
    /// Wraps the last OS error for a failed call.
    pub fn last_os_error(what: impl Into<String>) -> Self {
        CollectError::Query {
            what: what.into(),
            source: io::Error::last_os_error(),
        }
    }

    pub fn parse(what: impl Into<String>, detail: impl fmt::Display) -> Self {
        CollectError::Parse {
            what: what.into(),
            detail: detail.to_string(),
        }
    }
}

/// Output of one collector run.
#[derive(Debug, Default)]
pub struct Collection {
    pub metrics: Vec<Metric>,
    /// Per-item failures; the item was skipped, siblings were still collected.
    pub skipped: Vec<CollectError>,
}

impl Collection {
    pub fn push(&mut self, metrics: impl IntoIterator<Item = Metric>) {
        self.metrics.extend(metrics);
    }

    pub fn skip(&mut self, err: CollectError) {
        self.skipped.push(err);
    }
}

/// The five collectors, in the order they always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorKind {
    Filesystem,
    Load,
    Network,
    Memory,
    Device,
}

impl CollectorKind {
    pub const ALL: [CollectorKind; 5] = [
        CollectorKind::Filesystem,
        CollectorKind::Load,
        CollectorKind::Network,
        CollectorKind::Memory,
        CollectorKind::Device,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CollectorKind::Filesystem => "filesystem",
            CollectorKind::Load => "load",
            CollectorKind::Network => "network",
            CollectorKind::Memory => "memory",
            CollectorKind::Device => "device",
        }
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub use diskstats::{DeviceEntry, DeviceSnapshot, DeviceStatistics, DeviceStatsSource};
pub use filesystem::{FilesystemEntry, FilesystemSource, MountedFilesystem};
pub use loadavg::{LoadAverage, LoadAverageSource};
pub use memory::{MemorySource, PageCounter, SwapUsage};
pub use netdev::{AddressFamily, InterfaceAddress, InterfaceCounters, InterfaceSource};
