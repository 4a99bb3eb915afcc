//! # Canon CLI Module
//!
//! ## Available Commands
//!
//! - `validate` - Validate a declaration; fails when the verdict fails
//! - `summary` - Print a human-readable verdict summary
//! - `signature` - Print the canonical signature of a declaration
//! - `articles` - List the canon reference table
//! - `config` - Print the effective engine configuration

mod commands;

use crate::config::{ConfigOverrides, resolve_config};
use canon_core::{CanonEngine, CanonError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Canon - declarative geometry validation
///
/// Checks geometric declarations against a fixed canon of articles
/// before anything is realized.
#[derive(Parser, Debug)]
#[command(name = "canon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML engine configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Block only on FATAL findings
    #[arg(long, global = true)]
    pub lenient: bool,

    /// Canon version to validate under
    #[arg(long, global = true)]
    pub canon_version: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a declaration against the canon
    Validate {
        /// Path to the declaration (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Validate and print a human-readable summary
    Summary {
        /// Path to the declaration (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the canonical signature of a declaration
    Signature {
        /// Path to the declaration (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the canon articles
    Articles,

    /// Print the effective engine configuration
    Config,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), CanonError> {
    let overrides = ConfigOverrides {
        lenient: cli.lenient,
        canon_version: cli.canon_version,
    };
    let config = resolve_config(cli.config.as_deref(), &overrides)?;
    let json_mode = cli.json_mode;

    let engine = CanonEngine::with_config(config.clone())?;

    match cli.command {
        Commands::Validate { file } => cmd_validate(&engine, &file, json_mode, cli.verbose),
        Commands::Summary { file } => cmd_summary(&engine, &file, json_mode),
        Commands::Signature { file } => cmd_signature(&engine, &file, json_mode),
        Commands::Articles => cmd_articles(&engine, json_mode),
        Commands::Config => cmd_config(&config, json_mode),
    }
}
