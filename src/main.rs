use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use treecp::config::{Cli, Settings};
use treecp::logging::init_logging;

/// Some entries failed to copy
const EXIT_FAILURES: u8 = 1;
/// Invalid arguments or configuration
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_format.into()) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }

    // Convert CLI args to Settings - this validates immediately
    let settings = match Settings::try_from(cli).context("invalid configuration") {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match treecp::commands::copy::run(settings).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(EXIT_FAILURES),
    }
}
