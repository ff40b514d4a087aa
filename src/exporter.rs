//! One scrape: optional HTTP preamble, then every enabled collector in fixed
//! order, each rendered straight to the output sink.
//!
//! Collector failures never escape this module. They are logged and the next
//! collector runs, so a degraded subsystem only removes its own metrics from
//! the output.

use std::io::{self, Write};

use tracing::{debug, error};

use crate::collectors::{
    self, CollectError, Collection, CollectorKind, DeviceStatsSource, FilesystemSource,
    InterfaceSource, LoadAverageSource, MemorySource,
};
use crate::config::Settings;
use crate::render::{self, Renderer};

/// Kernel interfaces used by the collectors.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub filesystems: &'a dyn FilesystemSource,
    pub load: &'a dyn LoadAverageSource,
    pub interfaces: &'a dyn InterfaceSource,
    pub memory: &'a dyn MemorySource,
    pub devices: &'a dyn DeviceStatsSource,
}

impl<'a> Sources<'a> {
    /// All sources served by one host object.
    pub fn from_host<H>(host: &'a H) -> Self
    where
        H: FilesystemSource
            + LoadAverageSource
            + InterfaceSource
            + MemorySource
            + DeviceStatsSource
            + 'a,
    {
        Self {
            filesystems: host,
            load: host,
            interfaces: host,
            memory: host,
            devices: host,
        }
    }
}

/// Runs a single collector.
pub fn collect(kind: CollectorKind, sources: &Sources<'_>) -> Result<Collection, CollectError> {
    match kind {
        CollectorKind::Filesystem => collectors::filesystem::collect(sources.filesystems),
        CollectorKind::Load => collectors::loadavg::collect(sources.load),
        CollectorKind::Network => collectors::netdev::collect(sources.interfaces),
        CollectorKind::Memory => collectors::memory::collect(sources.memory),
        CollectorKind::Device => collectors::diskstats::collect(sources.devices),
    }
}

/// Writes one complete response to `out`.
///
/// Only write errors on `out` are returned.
pub fn run<W: Write>(settings: &Settings, sources: &Sources<'_>, out: &mut W) -> io::Result<()> {
    if settings.http_header {
        render::write_http_preamble(out)?;
    }

    let renderer = Renderer::new(&settings.namespace);
    for kind in CollectorKind::ALL {
        if !settings.is_enabled(kind) {
            debug!(collector = %kind, "Collector disabled");
            continue;
        }

        match collect(kind, sources) {
            Ok(collection) => {
                for err in &collection.skipped {
                    error!(collector = %kind, "{}", err);
                }
                debug!(
                    collector = %kind,
                    metrics = collection.metrics.len(),
                    skipped = collection.skipped.len(),
                    "Collector finished"
                );
                renderer.write_all(out, &collection.metrics)?;
            }
            Err(e) => error!(collector = %kind, "{}", e),
        }
    }

    out.flush()
}
