//! Relay: dispatch remote agent sessions and collect their JSON artifacts.
//!
//! This is the main entry point for the `relay` CLI. It parses arguments,
//! installs logging, dispatches to the appropriate command handler, and maps
//! errors and session outcomes to exit codes.

mod cli;
mod commands;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod extract;
pub mod fs;
pub mod poller;
pub mod prompt;
pub mod ratelimit;
pub mod retry;
pub mod runner;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "RELAY_LOG";

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "agent_relay=debug"
        } else {
            "agent_relay=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match commands::dispatch(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
