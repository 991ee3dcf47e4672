// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod cache;
mod cmd;
mod column;
mod config;
mod error;
mod generator;
mod json_schema;
mod output;
mod plan;
mod progress;
mod words;

use clap::Parser;
use cmd::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cmd::run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
