//! FreeBSD sources: getmntinfo, getloadavg, getifaddrs, sysctl, kvm and the
//! kern.devstat.all snapshot.

use std::ffi::{CStr, CString};
use std::io;
use std::mem;
use std::ptr;

use libc::{c_char, c_int, c_void};
use tracing::{debug, error};

use crate::collectors::{
    AddressFamily, CollectError, DeviceEntry, DeviceSnapshot, DeviceStatistics,
    DeviceStatsSource, FilesystemEntry, FilesystemSource, InterfaceAddress, InterfaceCounters,
    InterfaceSource, LoadAverage, LoadAverageSource, MemorySource, MountedFilesystem, PageCounter,
    SwapUsage,
};

// Indices into devstat.bytes / devstat.operations (enum devstat_trans_flags).
const DEVSTAT_READ: usize = 1;
const DEVSTAT_WRITE: usize = 2;
const DEVSTAT_FREE: usize = 3;

const DEFAULT_BLOCK_SIZE: u64 = 512;
const SNAPSHOT_ATTEMPTS: usize = 4;

/// Read-only kernel memory handle, used for swap statistics.
struct Kvm(*mut libc::kvm_t);

impl Kvm {
    fn open() -> Result<Self, CollectError> {
        // SAFETY: all pointers are NUL-terminated literals or null.
        let kd = unsafe {
            libc::kvm_open(
                ptr::null(),
                c"/dev/null".as_ptr(),
                ptr::null(),
                libc::O_RDONLY,
                c"kvm_open".as_ptr(),
            )
        };
        if kd.is_null() {
            return Err(CollectError::last_os_error("Opening kernel memory file"));
        }
        Ok(Self(kd))
    }
}

impl Drop for Kvm {
    fn drop(&mut self) {
        // SAFETY: the handle came from kvm_open and is closed once.
        unsafe {
            libc::kvm_close(self.0);
        }
    }
}

/// Kernel interfaces of the running FreeBSD host.
pub struct Host {
    kvm: Option<Kvm>,
}

impl Host {
    /// Opens the kernel memory handle. Failure only degrades swap figures.
    pub fn open() -> Self {
        let kvm = match Kvm::open() {
            Ok(kvm) => Some(kvm),
            Err(e) => {
                error!("Could not open kernel memory file: {}", e);
                None
            }
        };
        Self { kvm }
    }
}

/// Reads a sysctl into `buf`, returning the length the kernel wrote.
fn sysctl_into(name: &str, buf: &mut [u8]) -> Result<usize, CollectError> {
    let c_name = CString::new(name).map_err(|e| CollectError::parse(name, e))?;
    let mut len = buf.len();

    // SAFETY: buf is valid for len bytes and len is updated by the kernel.
    let rc = unsafe {
        libc::sysctlbyname(
            c_name.as_ptr(),
            buf.as_mut_ptr().cast::<c_void>(),
            &mut len,
            ptr::null(),
            0,
        )
    };
    if rc == -1 {
        return Err(CollectError::last_os_error(format!("sysctl {}", name)));
    }
    Ok(len)
}

/// Reads an unsigned integer sysctl stored as either 32 or 64 bits.
fn sysctl_u64(name: &str) -> Result<u64, CollectError> {
    let mut buf = [0u8; 8];
    let len = sysctl_into(name, &mut buf)?;
    decode_u64(&format!("sysctl {}", name), &buf[..len.min(buf.len())])
}

/// Decodes a native-endian `u_int` or `uint64_t` sysctl value.
fn decode_u64(what: &str, value: &[u8]) -> Result<u64, CollectError> {
    if let Ok(bytes) = <[u8; 4]>::try_from(value) {
        return Ok(u64::from(u32::from_ne_bytes(bytes)));
    }
    if let Ok(bytes) = <[u8; 8]>::try_from(value) {
        return Ok(u64::from_ne_bytes(bytes));
    }
    Err(CollectError::Length {
        what: what.to_string(),
        expected: 8,
        actual: value.len(),
    })
}

/// Returns the size of a variable-length sysctl.
fn sysctl_size(name: &str) -> Result<usize, CollectError> {
    let c_name = CString::new(name).map_err(|e| CollectError::parse(name, e))?;
    let mut len = 0usize;

    // SAFETY: a null old pointer asks only for the required length.
    let rc = unsafe {
        libc::sysctlbyname(c_name.as_ptr(), ptr::null_mut(), &mut len, ptr::null(), 0)
    };
    if rc == -1 {
        return Err(CollectError::last_os_error(format!("sysctl {}", name)));
    }
    Ok(len)
}

/// Converts a fixed-size C name field up to its terminating NUL.
fn c_chars(chars: &[c_char]) -> Vec<u8> {
    chars
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect()
}

fn c_string(chars: &[c_char]) -> String {
    String::from_utf8_lossy(&c_chars(chars)).into_owned()
}

impl FilesystemSource for Host {
    fn mounted_filesystems(&self) -> Result<Vec<MountedFilesystem>, CollectError> {
        let mut mounts: *mut libc::statfs = ptr::null_mut();

        // SAFETY: getmntinfo stores a pointer to a libc-owned array that
        // stays valid until the next call.
        let count = unsafe { libc::getmntinfo(&mut mounts, libc::MNT_WAIT) };
        if count <= 0 || mounts.is_null() {
            return Err(CollectError::Enumeration {
                what: "mounted filesystems",
                source: io::Error::last_os_error(),
            });
        }

        // SAFETY: count entries were returned above.
        let mounts = unsafe { std::slice::from_raw_parts(mounts, count as usize) };
        Ok(mounts
            .iter()
            .map(|fs| {
                Ok(FilesystemEntry {
                    device: c_string(&fs.f_mntfromname),
                    fstype: c_string(&fs.f_fstypename),
                    mount_point: c_string(&fs.f_mntonname),
                    blocks: fs.f_blocks,
                    block_size: fs.f_bsize,
                    free_blocks: fs.f_bfree,
                    available_blocks: fs.f_bavail,
                })
            })
            .collect())
    }
}

impl LoadAverageSource for Host {
    fn load_average(&self) -> Result<LoadAverage, CollectError> {
        let mut loadavg = [0f64; 3];

        // SAFETY: loadavg holds three doubles.
        let n = unsafe { libc::getloadavg(loadavg.as_mut_ptr(), 3) };
        if n < 3 {
            return Err(CollectError::last_os_error("getloadavg"));
        }

        Ok(LoadAverage {
            one_min: loadavg[0],
            five_min: loadavg[1],
            fifteen_min: loadavg[2],
        })
    }
}

/// Interface list returned by getifaddrs, released on drop.
struct IfAddrs(*mut libc::ifaddrs);

impl Drop for IfAddrs {
    fn drop(&mut self) {
        // SAFETY: the list came from getifaddrs and is freed once.
        unsafe { libc::freeifaddrs(self.0) }
    }
}

impl InterfaceSource for Host {
    fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>, CollectError> {
        let mut ifap: *mut libc::ifaddrs = ptr::null_mut();

        // SAFETY: ifap receives a list we free through IfAddrs.
        if unsafe { libc::getifaddrs(&mut ifap) } != 0 {
            return Err(CollectError::Enumeration {
                what: "network interfaces",
                source: io::Error::last_os_error(),
            });
        }
        let list = IfAddrs(ifap);

        let mut addresses = Vec::new();
        let mut cursor = list.0;
        while !cursor.is_null() {
            // SAFETY: cursor walks the list owned by `list`.
            let ifa = unsafe { &*cursor };
            cursor = ifa.ifa_next;

            // SAFETY: ifa_name is a NUL-terminated string for every entry.
            let name = unsafe { CStr::from_ptr(ifa.ifa_name) }
                .to_string_lossy()
                .into_owned();

            let family = if ifa.ifa_addr.is_null() {
                None
            } else {
                // SAFETY: checked non-null above.
                let family = c_int::from(unsafe { (*ifa.ifa_addr).sa_family });
                Some(match family {
                    libc::AF_LINK => AddressFamily::Link,
                    libc::AF_INET => AddressFamily::Inet,
                    libc::AF_INET6 => AddressFamily::Inet6,
                    _ => AddressFamily::Other,
                })
            };

            let counters = if family == Some(AddressFamily::Link) && !ifa.ifa_data.is_null() {
                // SAFETY: AF_LINK entries carry a struct if_data in ifa_data.
                let data = unsafe { &*(ifa.ifa_data as *const libc::if_data) };
                Some(InterfaceCounters {
                    rx_bytes: data.ifi_ibytes,
                    tx_bytes: data.ifi_obytes,
                    rx_errors: data.ifi_ierrors,
                    tx_errors: data.ifi_oerrors,
                })
            } else {
                None
            };

            addresses.push(InterfaceAddress {
                name,
                family,
                up: (ifa.ifa_flags as c_int) & libc::IFF_UP != 0,
                counters,
            });
        }

        Ok(addresses)
    }
}

impl MemorySource for Host {
    fn page_size(&self) -> Result<u64, CollectError> {
        // SAFETY: getpagesize has no preconditions.
        let size = unsafe { libc::getpagesize() };
        u64::try_from(size).map_err(|_| CollectError::parse("page size", size))
    }

    fn buffer_space(&self) -> Result<u64, CollectError> {
        sysctl_u64("vfs.bufspace")
    }

    fn page_count(&self, counter: PageCounter) -> Result<u64, CollectError> {
        let name = match counter {
            PageCounter::Total => "vm.stats.vm.v_page_count",
            PageCounter::Active => "vm.stats.vm.v_active_count",
            PageCounter::Inactive => "vm.stats.vm.v_inactive_count",
            PageCounter::Laundry => "vm.stats.vm.v_laundry_count",
            PageCounter::Wired => "vm.stats.vm.v_wire_count",
            PageCounter::Free => "vm.stats.vm.v_free_count",
        };
        sysctl_u64(name)
    }

    fn swap_usage(&self) -> Result<SwapUsage, CollectError> {
        let kvm = self.kvm.as_ref().ok_or_else(|| CollectError::Query {
            what: "kvm_getswapinfo".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "kernel memory file not open"),
        })?;

        // SAFETY: kvm_swap is plain old data.
        let mut swap: [libc::kvm_swap; 1] = unsafe { mem::zeroed() };
        // SAFETY: one element is available; the kernel fills in the summary.
        let n = unsafe { libc::kvm_getswapinfo(kvm.0, swap.as_mut_ptr(), 1, 0) };
        if n < 0 {
            return Err(CollectError::last_os_error("kvm_getswapinfo"));
        }

        Ok(SwapUsage {
            total_pages: u64::from(swap[0].ksw_total),
            used_pages: u64::from(swap[0].ksw_used),
        })
    }

    fn swap_max_pages(&self) -> Result<u64, CollectError> {
        sysctl_u64("vm.swap_maxpages")
    }
}

/// Splits a kern.devstat.all buffer into its entries.
///
/// The buffer starts with the `long` generation counter, followed by packed
/// `struct devstat` records. A trailing partial record is ignored.
fn parse_devstat_all(data: &[u8]) -> Result<Vec<libc::devstat>, CollectError> {
    let header = mem::size_of::<libc::c_long>();
    let entry = mem::size_of::<libc::devstat>();

    if data.len() < header {
        return Err(CollectError::Length {
            what: "sysctl kern.devstat.all".to_string(),
            expected: header,
            actual: data.len(),
        });
    }

    Ok(data[header..]
        .chunks_exact(entry)
        .map(|chunk| {
            // SAFETY: chunk holds exactly one devstat; the buffer is not
            // aligned for it, hence read_unaligned.
            unsafe { ptr::read_unaligned(chunk.as_ptr().cast::<libc::devstat>()) }
        })
        .collect())
}

/// Accumulated totals for one device entry.
fn statistics(ds: &libc::devstat) -> Result<DeviceStatistics, CollectError> {
    // The kernel bumps sequence1 before and sequence0 after an update.
    if ds.sequence0 != ds.sequence1 {
        return Err(CollectError::Inconsistent(c_string(&ds.device_name)));
    }

    let read = ds.bytes[DEVSTAT_READ];
    let write = ds.bytes[DEVSTAT_WRITE];
    let total_bytes = read
        .saturating_add(write)
        .saturating_add(ds.bytes[DEVSTAT_FREE]);
    let block_size = match u64::from(ds.block_size) {
        0 => DEFAULT_BLOCK_SIZE,
        size => size,
    };

    Ok(DeviceStatistics {
        total_bytes,
        total_bytes_read: read,
        total_bytes_write: write,
        total_transfers: ds.operations.iter().copied().fold(0, u64::saturating_add),
        total_transfers_read: ds.operations[DEVSTAT_READ],
        total_transfers_write: ds.operations[DEVSTAT_WRITE],
        total_blocks: total_bytes / block_size,
        queue_length: u64::from(ds.start_count.wrapping_sub(ds.end_count)),
    })
}

/// Copy of kern.devstat.all taken in one sysctl call.
struct DevstatSnapshot {
    devices: Vec<DeviceEntry>,
    stats: Vec<libc::devstat>,
}

impl DevstatSnapshot {
    fn take() -> Result<Self, CollectError> {
        let entry = mem::size_of::<libc::devstat>();

        let mut buf: Vec<u8> = Vec::new();
        for attempt in 0..SNAPSHOT_ATTEMPTS {
            // Leave room for devices attached between the two calls.
            let wanted = sysctl_size("kern.devstat.all")? + 4 * entry;
            buf.clear();
            buf.try_reserve_exact(wanted)
                .map_err(|_| CollectError::Allocation("device info".to_string()))?;
            buf.resize(wanted, 0);

            match sysctl_into("kern.devstat.all", &mut buf) {
                Ok(len) => {
                    buf.truncate(len);
                    break;
                }
                Err(CollectError::Query { source, .. })
                    if source.raw_os_error() == Some(libc::ENOMEM)
                        && attempt + 1 < SNAPSHOT_ATTEMPTS =>
                {
                    debug!("Device list grew during snapshot, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        let stats = parse_devstat_all(&buf)?;
        let devices = stats
            .iter()
            .map(|ds| DeviceEntry::new(c_chars(&ds.device_name), Some(ds.unit_number)))
            .collect();

        Ok(Self { devices, stats })
    }
}

impl DeviceSnapshot for DevstatSnapshot {
    fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    fn compute_statistics(&self, index: usize) -> Result<DeviceStatistics, CollectError> {
        let ds = self
            .stats
            .get(index)
            .ok_or_else(|| CollectError::Inconsistent(format!("device #{}", index)))?;
        statistics(ds)
    }
}

impl DeviceStatsSource for Host {
    fn snapshot(&self) -> Result<Box<dyn DeviceSnapshot + '_>, CollectError> {
        Ok(Box::new(DevstatSnapshot::take()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, unit: c_int) -> libc::devstat {
        // SAFETY: devstat is plain old data; zero is a valid pattern.
        let mut ds: libc::devstat = unsafe { mem::zeroed() };
        for (dst, src) in ds.device_name.iter_mut().zip(name.bytes()) {
            *dst = src as c_char;
        }
        ds.unit_number = unit;
        ds
    }

    fn devstat_all(entries: &[libc::devstat]) -> Vec<u8> {
        let generation: libc::c_long = 42;
        let mut data = generation.to_ne_bytes().to_vec();
        // SAFETY: devstat is plain old data viewed as bytes.
        unsafe {
            for ds in entries {
                data.extend_from_slice(std::slice::from_raw_parts(
                    (ds as *const libc::devstat).cast::<u8>(),
                    mem::size_of::<libc::devstat>(),
                ));
            }
        }
        data
    }

    #[test]
    fn test_decode_sysctl_widths() {
        assert_eq!(decode_u64("v_free_count", &7u32.to_ne_bytes()).unwrap(), 7);
        assert_eq!(
            decode_u64("bufspace", &(1u64 << 40).to_ne_bytes()).unwrap(),
            1 << 40
        );

        let err = decode_u64("swap_maxpages", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, CollectError::Length { actual: 3, .. }));
    }

    #[test]
    fn test_devstat_header_only() {
        let stats = parse_devstat_all(&devstat_all(&[])).unwrap();
        assert!(stats.is_empty());

        let short = vec![0u8; mem::size_of::<libc::c_long>() - 1];
        assert!(matches!(
            parse_devstat_all(&short),
            Err(CollectError::Length { .. })
        ));
    }

    #[test]
    fn test_devstat_entries_are_decoded() {
        let mut ada = device("ada", 0);
        ada.bytes[DEVSTAT_READ] = 4096;
        ada.bytes[DEVSTAT_WRITE] = 8192;
        ada.bytes[DEVSTAT_FREE] = 512;
        ada.operations = [1, 2, 3, 4];
        ada.block_size = 512;
        ada.start_count = 10;
        ada.end_count = 7;

        let mut data = devstat_all(&[ada, device("cd", 1)]);
        // Partial trailing record.
        data.extend_from_slice(&[0u8; 16]);

        let stats = parse_devstat_all(&data).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(c_chars(&stats[0].device_name), b"ada");
        assert_eq!(c_chars(&stats[1].device_name), b"cd");
        assert_eq!(stats[1].unit_number, 1);

        let computed = statistics(&stats[0]).unwrap();
        assert_eq!(computed.total_bytes_read, 4096);
        assert_eq!(computed.total_bytes_write, 8192);
        assert_eq!(computed.total_bytes, 4096 + 8192 + 512);
        assert_eq!(computed.total_transfers, 10);
        assert_eq!(computed.total_transfers_read, 2);
        assert_eq!(computed.total_transfers_write, 3);
        assert_eq!(computed.total_blocks, 25);
        assert_eq!(computed.queue_length, 3);
    }

    #[test]
    fn test_torn_entry_is_inconsistent() {
        let mut ds = device("da", 3);
        ds.sequence0 = 5;
        ds.sequence1 = 6;

        let err = statistics(&ds).unwrap_err();
        assert!(matches!(err, CollectError::Inconsistent(ref name) if name == "da"));
    }

    #[test]
    fn test_unknown_block_size_defaults() {
        let mut ds = device("nvd", 0);
        ds.bytes[DEVSTAT_READ] = 2048;
        assert_eq!(statistics(&ds).unwrap().total_blocks, 4);
    }
}
