//! axial — CLI and daemon entry point

use axial::cli::{Cli, Commands};
use axial::{commands, logging};
use axial_core::config::AxialConfig;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (filter, log_file) = match &cli.command {
        Commands::Daemon { log_file, .. } => (logging::DEFAULT_FILTER, log_file.as_deref()),
        _ => ("axial=warn", None),
    };
    let guard = match logging::init(filter, log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    };

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}", e);
            commands::exit_code(&e)
        }
    };
    drop(guard);
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = AxialConfig::resolve_path(cli.config.as_deref());
    let config = AxialConfig::load(&path)?.apply_env();
    commands::run(cli.command, config).await
}
