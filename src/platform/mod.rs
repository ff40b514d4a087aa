//! Production kernel sources, one per target platform.
//!
//! Every platform exposes a `Host` implementing all collector source traits.

#[cfg(target_os = "freebsd")]
mod freebsd;
#[cfg(target_os = "freebsd")]
pub use freebsd::Host;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::Host;

#[cfg(not(any(target_os = "freebsd", target_os = "linux")))]
mod unsupported;
#[cfg(not(any(target_os = "freebsd", target_os = "linux")))]
pub use unsupported::Host;
