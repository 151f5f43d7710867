//! Kinship - note similarity and correlation CLI
//!
//! Finds near-duplicate notes, builds a weighted relationship graph,
//! extracts topic clusters and ranks related notes over a note snapshot.

mod cli;
mod commands;

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use cli::parse::{clap_failure, requests_json};
use cli::{Cli, OutputFormat};
use kinship_core::error::{ExitCode as KinshipExitCode, KinshipError};
use kinship_core::logging;

fn main() -> ExitCode {
    let start = Instant::now();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Without a parsed Cli the JSON request has to come from argv
            match clap_failure(&err) {
                Some(failure) if requests_json(env::args().skip(1)) => {
                    return report(&failure, OutputFormat::Json, false);
                }
                _ => err.exit(),
            }
        }
    };

    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    tracing::debug!(elapsed = ?start.elapsed(), "parse_args");

    match commands::dispatch::run(&cli, start) {
        Ok(()) => ExitCode::from(KinshipExitCode::Success as u8),
        Err(e) => report(&e, cli.format, cli.quiet),
    }
}

/// Print `err` the way `format` asks and map it to a process exit code
fn report(err: &KinshipError, format: OutputFormat, quiet: bool) -> ExitCode {
    match format {
        OutputFormat::Json => eprintln!("{}", err.to_json()),
        OutputFormat::Human if !quiet => eprintln!("error: {}", err),
        OutputFormat::Human => {}
    }
    ExitCode::from(err.exit_code() as u8)
}
