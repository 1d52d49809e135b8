//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Rebuild project libraries and restart dependent sessions on save
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hswatch.toml, searched upward from cwd)
    #[arg(short = 'C', long, global = true, default_value = "hswatch.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch source dirs, rebuild changed libraries and restart sessions
    #[command(visible_alias = "w")]
    Watch,

    /// Build library targets once
    #[command(visible_alias = "b")]
    Build {
        /// Packages whose library to build (default: every library)
        #[arg(value_name = "PACKAGE")]
        packages: Vec<String>,

        /// Treat compiler warnings as errors
        #[arg(short, long)]
        strict: bool,
    },

    /// List components, or resolve a file to its component
    #[command(visible_alias = "c")]
    Components {
        /// Source file to resolve
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Output JSON
        #[arg(short, long)]
        json: bool,
    },
}
