//! CLI arguments for freebsd-exporter.
//!
//! The exporter is started by inetd once per connection, so the surface is
//! deliberately small: four long flags and no positional arguments.

use clap::error::{ContextKind, Error as ClapError, ErrorKind};
use clap::Parser;

/// Main CLI arguments structure
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "freebsd-exporter",
    about = "Prints FreeBSD system metrics in Prometheus text format and exits",
    long_about = "Prints FreeBSD system metrics in Prometheus text format and exits.\n\n\
                  Intended to be spawned by inetd for every scrape: filesystem usage, load \
                  averages, network interface counters, memory and swap usage and per-device \
                  disk I/O are read from the running kernel and written to standard output, \
                  preceded by a minimal HTTP response header.",
    disable_version_flag = true
)]
pub struct Args {
    /// Disable HTTP headers
    #[arg(long)]
    pub no_http_header: bool,

    /// Disable logging messages using syslog
    #[arg(long)]
    pub no_syslog: bool,

    /// Print the version information
    #[arg(long)]
    pub version: bool,
}

/// `<program> version <major>.<minor>.<patch>`
pub fn version_line() -> String {
    format!(
        "{} version {}.{}.{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    )
}

/// True when clap stopped parsing only to print help.
pub fn is_help_request(err: &ClapError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

/// The argument clap rejected, for the "Unknown option" message.
pub fn offending_argument(err: &ClapError) -> String {
    err.get(ContextKind::InvalidArg)
        .map(|value| value.to_string())
        .unwrap_or_else(|| err.kind().to_string())
}
