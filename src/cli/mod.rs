//! CLI module for VidBatch
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{ProbeArgs, RunArgs};

/// VidBatch batch video processor
///
/// Applies a chosen set of tasks (segment, convert, audio, resize, frames,
/// thumbnail) to every video in a folder and writes a CSV report.
#[derive(Parser, Debug)]
#[command(name = "vidbatch")]
#[command(about = "VidBatch - Batch video processing with a CSV report")]
#[command(version)]
pub struct Cli {
    /// Logging level or filter directive (overrides config and VIDBATCH_LOG_LEVEL)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (default: ./vidbatch.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process every video in a folder
    Run(RunArgs),
    /// Print the metadata of a single video
    Probe(ProbeArgs),
}
