//! Fallback for platforms without a kernel source; every query fails.

use crate::collectors::{
    CollectError, DeviceSnapshot, DeviceStatsSource, FilesystemSource, InterfaceAddress,
    InterfaceSource, LoadAverage, LoadAverageSource, MemorySource, MountedFilesystem, PageCounter,
    SwapUsage,
};

#[derive(Debug, Default)]
pub struct Host;

impl Host {
    pub fn open() -> Self {
        Host
    }
}

impl FilesystemSource for Host {
    fn mounted_filesystems(&self) -> Result<Vec<MountedFilesystem>, CollectError> {
        Err(CollectError::Unsupported("mount table"))
    }
}

impl LoadAverageSource for Host {
    fn load_average(&self) -> Result<LoadAverage, CollectError> {
        Err(CollectError::Unsupported("load average"))
    }
}

impl InterfaceSource for Host {
    fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>, CollectError> {
        Err(CollectError::Unsupported("interface statistics"))
    }
}

impl MemorySource for Host {
    fn page_size(&self) -> Result<u64, CollectError> {
        Err(CollectError::Unsupported("page size"))
    }

    fn buffer_space(&self) -> Result<u64, CollectError> {
        Err(CollectError::Unsupported("buffer space"))
    }

    fn page_count(&self, _counter: PageCounter) -> Result<u64, CollectError> {
        Err(CollectError::Unsupported("page counters"))
    }

    fn swap_usage(&self) -> Result<SwapUsage, CollectError> {
        Err(CollectError::Unsupported("swap statistics"))
    }

    fn swap_max_pages(&self) -> Result<u64, CollectError> {
        Err(CollectError::Unsupported("swap limit"))
    }
}

impl DeviceStatsSource for Host {
    fn snapshot(&self) -> Result<Box<dyn DeviceSnapshot + '_>, CollectError> {
        Err(CollectError::Unsupported("device statistics"))
    }
}
