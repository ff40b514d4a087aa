//! Filesystem space collector.
//!
//! Emits size, used and free bytes for every mounted filesystem. `used` is
//! `(blocks - free blocks) * block size`, `free` is the space available to
//! unprivileged users (`available blocks * block size`), so reserved blocks
//! are counted in neither.

use super::{CollectError, Collection};
use crate::render;

/// One row of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemEntry {
    pub device: String,
    pub fstype: String,
    pub mount_point: String,
    pub blocks: u64,
    pub block_size: u64,
    pub free_blocks: u64,
    /// Signed: an over-full filesystem reports negative availability.
    pub available_blocks: i64,
}

impl FilesystemEntry {
    pub fn size_bytes(&self) -> u64 {
        self.blocks.saturating_mul(self.block_size)
    }

    pub fn used_bytes(&self) -> u64 {
        self.blocks
            .saturating_sub(self.free_blocks)
            .saturating_mul(self.block_size)
    }

    pub fn free_bytes(&self) -> i64 {
        self.available_blocks
            .saturating_mul(i64::try_from(self.block_size).unwrap_or(i64::MAX))
    }
}

/// One mount table row, or the reason its space figures are unavailable.
pub type MountedFilesystem = Result<FilesystemEntry, CollectError>;

/// Access to the live mount table.
pub trait FilesystemSource {
    /// Returns every mounted filesystem, waiting for the table to be
    /// consistent rather than returning cached data.
    fn mounted_filesystems(&self) -> Result<Vec<MountedFilesystem>, CollectError>;
}

pub fn collect(source: &dyn FilesystemSource) -> Result<Collection, CollectError> {
    let entries = source.mounted_filesystems()?;

    let mut collection = Collection::default();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                collection.skip(e);
                continue;
            }
        };
        collection.push(render::filesystem(
            &entry.device,
            &entry.fstype,
            &entry.mount_point,
            entry.size_bytes(),
            entry.used_bytes(),
            entry.free_bytes(),
        ));
    }

    Ok(collection)
}
