//! Subcommand enum definitions for CLI

use clap::Subcommand;
use std::path::PathBuf;

/// Diff guide commands
#[derive(Subcommand)]
pub enum GuideCommands {
    /// Load and validate a guide file, then list its root tags
    Check {
        /// Diff guide file (.toml or .json)
        path: PathBuf,
    },
}

/// Batch commands
#[derive(Subcommand)]
pub enum BatchCommands {
    /// Diff every modded file against the base file at the same relative path
    Diff {
        /// Diff guide file (.toml or .json)
        #[arg(short, long)]
        guides: PathBuf,

        /// Base (vanilla) directory
        base: PathBuf,

        /// Modded directory
        modded: PathBuf,

        /// Output directory for command documents
        destination: PathBuf,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Apply every command document to the base file at the same relative path
    Apply {
        /// Base directory
        base: PathBuf,

        /// Directory of command documents
        commands: PathBuf,

        /// Output directory for merged files
        destination: PathBuf,

        /// Abort a file at its first failing command
        #[arg(long)]
        stop_on_error: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },
}
