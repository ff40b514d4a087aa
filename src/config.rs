//! Configuration management for freebsd-exporter.
//!
//! An optional config file (YAML, JSON or TOML) is looked up at fixed
//! locations and merged with the CLI flags into an immutable [`Settings`]
//! value. Precedence: CLI flag > config file > default.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::cli::Args;
use crate::collectors::CollectorKind;

pub const DEFAULT_NAMESPACE: &str = "freebsd";

/// Searched in order; the first existing file wins.
pub const CONFIG_LOCATIONS: [&str; 8] = [
    "/usr/local/etc/freebsd-exporter.yaml",
    "/usr/local/etc/freebsd-exporter.yml",
    "/usr/local/etc/freebsd-exporter.json",
    "/usr/local/etc/freebsd-exporter.toml",
    "/etc/freebsd-exporter.yaml",
    "/etc/freebsd-exporter.yml",
    "/etc/freebsd-exporter.json",
    "/etc/freebsd-exporter.toml",
];

static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("namespace pattern is valid")
});

/// Log level options. There is no "off": errors are always logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => bail!(
                "Invalid log_level '{}', expected one of error/warn/info/debug/trace",
                other
            ),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Contents of the config file; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    /// Metric name prefix
    pub namespace: Option<String>,
    #[serde(alias = "http-header")]
    pub http_header: Option<bool>,
    pub syslog: Option<bool>,
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // Collector enable flags
    #[serde(alias = "enable-filesystem-collector")]
    pub enable_filesystem_collector: Option<bool>,
    #[serde(alias = "enable-load-collector")]
    pub enable_load_collector: Option<bool>,
    #[serde(alias = "enable-network-collector")]
    pub enable_network_collector: Option<bool>,
    #[serde(alias = "enable-memory-collector")]
    pub enable_memory_collector: Option<bool>,
    #[serde(alias = "enable-device-collector")]
    pub enable_device_collector: Option<bool>,
}

impl Config {
    fn collector_enabled(&self, kind: CollectorKind) -> bool {
        let flag = match kind {
            CollectorKind::Filesystem => self.enable_filesystem_collector,
            CollectorKind::Load => self.enable_load_collector,
            CollectorKind::Network => self.enable_network_collector,
            CollectorKind::Memory => self.enable_memory_collector,
            CollectorKind::Device => self.enable_device_collector,
        };
        flag.unwrap_or(true)
    }
}

/// Effective, validated settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub namespace: String,
    pub http_header: bool,
    pub syslog: bool,
    pub log_level: LogLevel,
    /// Enabled collectors, always in run order.
    pub collectors: Vec<CollectorKind>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            http_header: true,
            syslog: true,
            log_level: LogLevel::Info,
            collectors: CollectorKind::ALL.to_vec(),
        }
    }
}

impl Settings {
    /// Settings from CLI flags alone, ignoring any config file.
    pub fn from_args(args: &Args) -> Self {
        Self {
            http_header: !args.no_http_header,
            syslog: !args.no_syslog,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, kind: CollectorKind) -> bool {
        self.collectors.contains(&kind)
    }
}

/// Merges CLI flags over the config file and validates the result.
pub fn resolve_settings(args: &Args, config: &Config) -> anyhow::Result<Settings> {
    let namespace = config
        .namespace
        .clone()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    if !NAMESPACE_RE.is_match(&namespace) {
        bail!(
            "Invalid namespace '{}': not a valid metric name prefix",
            namespace
        );
    }

    let log_level = match config.log_level.as_deref() {
        Some(level) => level.parse()?,
        None => LogLevel::Info,
    };

    // The CLI can only switch things off.
    let http_header = !args.no_http_header && config.http_header.unwrap_or(true);
    let syslog = !args.no_syslog && config.syslog.unwrap_or(true);

    let collectors = CollectorKind::ALL
        .into_iter()
        .filter(|kind| config.collector_enabled(*kind))
        .collect();

    Ok(Settings {
        namespace,
        http_header,
        syslog,
        log_level,
        collectors,
    })
}

/// Settings for `args` and the config file at `path` (or the default
/// locations). When the file cannot be used the flags alone apply and the
/// error is handed back, to be logged once the logging sink is up.
pub fn settings_or_fallback(
    args: &Args,
    path: Option<&Path>,
) -> (Settings, Option<anyhow::Error>) {
    match load_config(path).and_then(|config| resolve_settings(args, &config)) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::from_args(args), Some(e)),
    }
}

/// Loads the config file at `path`, or from the first existing default
/// location. A missing file yields the empty config.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match CONFIG_LOCATIONS.iter().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    parse_config_file(&path)
}

fn parse_config_file(path: &Path) -> anyhow::Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
    };

    Ok(config)
}
