//! Physical and swap memory collector.
//!
//! Page counters are multiplied by the page size. Every counter is read on
//! its own: a failed read is recorded, reported as zero, and does not stop
//! the remaining reads. Swap figures are kilobytes, with the raw device total
//! clamped to the largest swap size the kernel will allocate.

use super::{CollectError, Collection};
use crate::render;

/// Page-granular virtual memory counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCounter {
    Total,
    Active,
    Inactive,
    /// Pages queued for writeback.
    Laundry,
    /// Unreclaimable pages.
    Wired,
    Free,
}

impl PageCounter {
    /// Counters in output order.
    pub const ALL: [PageCounter; 6] = [
        PageCounter::Total,
        PageCounter::Active,
        PageCounter::Inactive,
        PageCounter::Laundry,
        PageCounter::Wired,
        PageCounter::Free,
    ];

    /// Field name used in `mem_<field>_bytes`.
    pub fn field(self) -> &'static str {
        match self {
            PageCounter::Total => "size",
            PageCounter::Active => "active",
            PageCounter::Inactive => "inactive",
            PageCounter::Laundry => "laundry",
            PageCounter::Wired => "wire",
            PageCounter::Free => "free",
        }
    }
}

/// Raw swap totals in pages, summed over all swap devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapUsage {
    pub total_pages: u64,
    pub used_pages: u64,
}

/// Swap capacity and usage in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapState {
    pub size_kb: u64,
    pub used_kb: u64,
}

pub trait MemorySource {
    fn page_size(&self) -> Result<u64, CollectError>;

    /// Buffer cache size, already in bytes.
    fn buffer_space(&self) -> Result<u64, CollectError>;

    fn page_count(&self, counter: PageCounter) -> Result<u64, CollectError>;

    fn swap_usage(&self) -> Result<SwapUsage, CollectError>;

    /// Upper bound on swap pages the kernel will actually use.
    fn swap_max_pages(&self) -> Result<u64, CollectError>;
}

/// Clamps the raw swap total and converts it to kilobytes.
///
/// `max_pages` of `None` means no limit is known.
pub fn swap_state(usage: SwapUsage, max_pages: Option<u64>, page_size: u64) -> SwapState {
    if usage.total_pages == 0 {
        return SwapState::default();
    }

    let total = match max_pages {
        Some(max) => usage.total_pages.min(max),
        None => usage.total_pages,
    };
    let to_kb = |pages: u64| -> u64 {
        let bytes = u128::from(pages) * u128::from(page_size);
        u64::try_from(bytes / 1024).unwrap_or(u64::MAX)
    };

    let size_kb = to_kb(total);
    let free_kb = to_kb(total.saturating_sub(usage.used_pages));
    SwapState {
        size_kb,
        used_kb: size_kb - free_kb,
    }
}

pub fn collect(source: &dyn MemorySource) -> Result<Collection, CollectError> {
    let page_size = source.page_size()?;
    let mut collection = Collection::default();

    let bufspace = source.buffer_space().unwrap_or_else(|e| {
        collection.skip(e);
        0
    });
    collection.push([render::memory("bufspace", bufspace)]);

    for counter in PageCounter::ALL {
        let pages = source.page_count(counter).unwrap_or_else(|e| {
            collection.skip(e);
            0
        });
        collection.push([render::memory(
            counter.field(),
            pages.saturating_mul(page_size),
        )]);
    }

    let swap = match source.swap_usage() {
        Ok(usage) if usage.total_pages > 0 => {
            let max_pages = source
                .swap_max_pages()
                .map_err(|e| collection.skip(e))
                .ok();
            swap_state(usage, max_pages, page_size)
        }
        Ok(_) => SwapState::default(),
        Err(e) => {
            collection.skip(e);
            SwapState::default()
        }
    };
    collection.push([
        render::memory("swap_size", swap.size_kb),
        render::memory("swap_used", swap.used_kb),
    ]);

    Ok(collection)
}
