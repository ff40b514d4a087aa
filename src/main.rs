//! freebsd-exporter - version 0.1.0
//!
//! Entry point: parse flags, resolve settings, set up logging, print one
//! scrape to standard output and exit.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use freebsd_exporter::cli::{self, Args};
use freebsd_exporter::config;
use freebsd_exporter::exporter::{self, Sources};
use freebsd_exporter::logging;
use freebsd_exporter::platform::Host;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if cli::is_help_request(&e) => {
            print!("{}", e.render());
            let _ = io::stdout().flush();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Unknown option: {}", cli::offending_argument(&e));
            return ExitCode::from(1);
        }
    };

    if args.version {
        println!("{}", cli::version_line());
        return ExitCode::SUCCESS;
    }

    // A broken config file is reported through the logging sink like any
    // other diagnostic, never written ahead of the response.
    let (settings, config_error) = config::settings_or_fallback(&args, None);
    let _logging = logging::init(&settings);
    if let Some(e) = config_error {
        error!("Ignoring configuration file: {:#}", e);
    }
    debug!(
        "{} built {}",
        cli::version_line(),
        env!("VERGEN_BUILD_TIMESTAMP")
    );

    let host = Host::open();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = exporter::run(&settings, &Sources::from_host(&host), &mut out) {
        error!("Could not write metrics: {}", e);
    }

    ExitCode::SUCCESS
}
