//! Medrag CLI
//!
//! Patient-aware medical evidence search and medication safety checks.

use anyhow::Result;
use clap::Parser;
use medrag_core::error::exit_codes;
use medrag_core::{Config, MedRagError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<MedRagError>()
            .map(|e| e.exit_code())
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Search(args) => commands::search::run(args, &config, cli.format).await,
        Commands::Interactions(args) => commands::interactions::run(args, &config, cli.format),
        Commands::Consult(args) => commands::consult::run(args, &config, cli.format).await,
        Commands::Index(args) => commands::index::run(args, &config, cli.format).await,
        Commands::Graph(args) => commands::graph::run(args, &config, cli.format),
        Commands::Drugs(args) => commands::graph::run_drugs(args, &config, cli.format),
    }
}
