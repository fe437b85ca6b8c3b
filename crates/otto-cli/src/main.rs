//! Otto CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use otto_cli::cli::Cli;
use otto_cli::commands;

fn main() {
    // Load .env.local if it exists
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.runtime_config();
    if let Err(e) = commands::execute(cli.command, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
