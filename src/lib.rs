//! FreeBSD Prometheus exporter library.
//!
//! A single-shot metrics collector: every invocation reads filesystem usage,
//! load averages, network interface counters, memory and swap usage and
//! per-device disk I/O from the live kernel, prints them in the Prometheus
//! text exposition format and exits. It is meant to be spawned by inetd for
//! each scrape, so there is no server loop, no cache and no shared state.
//!
//! # Usage
//!
//! ```rust
//! use freebsd_exporter::collectors::{CollectError, LoadAverage, LoadAverageSource};
//! use freebsd_exporter::collectors::loadavg;
//! use freebsd_exporter::render::Renderer;
//!
//! struct Fixed;
//!
//! impl LoadAverageSource for Fixed {
//!     fn load_average(&self) -> Result<LoadAverage, CollectError> {
//!         Ok(LoadAverage { one_min: 0.5, five_min: 0.75, fifteen_min: 1.0 })
//!     }
//! }
//!
//! let collection = loadavg::collect(&Fixed).unwrap();
//! let mut out = Vec::new();
//! Renderer::new("freebsd").write_all(&mut out, &collection.metrics).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("freebsd_load1 0.500000\n"));
//! ```

pub mod cli;
pub mod collectors;
pub mod config;
pub mod exporter;
pub mod logging;
pub mod metric;
pub mod platform;
pub mod render;

// Re-export main types for convenience
pub use collectors::{CollectError, Collection, CollectorKind};
pub use config::Settings;
pub use exporter::Sources;
pub use metric::{Metric, MetricValue};
