//! Network interface statistics collector.
//!
//! The interface list holds one entry per (interface, address) pair. Only the
//! link-layer entry of an interface that is administratively up carries the
//! byte and error counters, so exactly that entry is used.

use std::collections::HashSet;

use super::{CollectError, Collection};
use crate::render;

/// Address family of an interface list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Link,
    Inet,
    Inet6,
    Other,
}

/// Byte and error counters of a link-layer entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
}

/// One entry of the interface address list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    /// `None` when the entry has no address.
    pub family: Option<AddressFamily>,
    pub up: bool,
    pub counters: Option<InterfaceCounters>,
}

pub trait InterfaceSource {
    fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>, CollectError>;
}

pub fn collect(source: &dyn InterfaceSource) -> Result<Collection, CollectError> {
    let addresses = source.interface_addresses()?;

    let mut collection = Collection::default();
    let mut seen = HashSet::new();

    for addr in &addresses {
        if addr.family != Some(AddressFamily::Link) || !addr.up {
            continue;
        }
        if !seen.insert(addr.name.as_str()) {
            continue;
        }

        let Some(counters) = addr.counters else {
            collection.skip(CollectError::parse(
                format!("counters of {}", addr.name),
                "link-layer entry without interface data",
            ));
            continue;
        };

        // Input and output errors are reported as one counter.
        let errors = counters.rx_errors.saturating_add(counters.tx_errors);
        collection.push(render::network_interface(
            &addr.name,
            counters.rx_bytes,
            counters.tx_bytes,
            errors,
        ));
    }

    Ok(collection)
}
