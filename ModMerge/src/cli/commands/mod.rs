//! CLI subcommands

use clap::Subcommand;
use std::path::PathBuf;

pub mod apply;
pub mod batch;
pub mod definitions;
pub mod diff;
pub mod execute;
pub mod guide;

use definitions::{BatchCommands, GuideCommands};

#[derive(Subcommand)]
pub enum Commands {
    /// Diff a modded file against its base and write a command document
    Diff {
        /// Diff guide file (.toml or .json)
        #[arg(short, long)]
        guides: PathBuf,

        /// Base (vanilla) XML file
        base: PathBuf,

        /// Modded XML file
        modded: PathBuf,

        /// Output command document (printed to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Apply a command document to a base file
    Apply {
        /// Base XML file
        base: PathBuf,

        /// Command document
        commands: PathBuf,

        /// Output XML file (printed to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Abort at the first failing command
        #[arg(long)]
        stop_on_error: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print a file with its diff annotations (for debugging guides)
    Annotate {
        /// Diff guide file (.toml or .json)
        #[arg(short, long)]
        guides: PathBuf,

        /// XML file to annotate
        input: PathBuf,
    },

    /// Diff guide commands
    Guide {
        #[command(subcommand)]
        command: GuideCommands,
    },

    /// Directory-level diff and apply
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
}
