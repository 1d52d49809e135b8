//! hswatch - rebuild project libraries and restart dependent sessions on save.

mod cli;
mod config;
mod core;
mod host;
mod logger;
mod rebuild;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = ProjectConfig::load(&cli.config)?;

    match &cli.command {
        Commands::Watch => cli::watch::run_watch(&config),
        Commands::Build { packages, strict } => {
            cli::build::build_libraries(&config, packages, *strict)
        }
        Commands::Components { file, json } => {
            cli::components::run_components(&config, file.as_deref(), *json)
        }
    }
}
