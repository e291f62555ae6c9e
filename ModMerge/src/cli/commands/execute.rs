//! Command execution implementations

use super::Commands;
use super::definitions::{BatchCommands, GuideCommands};
use super::{apply, batch, diff, guide};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Diff {
                guides,
                base,
                modded,
                output,
                quiet,
            } => diff::diff(guides, base, modded, output.as_deref(), *quiet),
            Commands::Apply {
                base,
                commands,
                output,
                stop_on_error,
                quiet,
            } => apply::apply(base, commands, output.as_deref(), *stop_on_error, *quiet),
            Commands::Annotate { guides, input } => diff::annotate(guides, input),
            Commands::Guide { command } => command.execute(),
            Commands::Batch { command } => command.execute(),
        }
    }
}

impl GuideCommands {
    /// Execute the selected guide command.
    ///
    /// # Errors
    /// Returns an error if the guide file cannot be loaded.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            GuideCommands::Check { path } => guide::check(path),
        }
    }
}

impl BatchCommands {
    /// Execute the selected batch command.
    ///
    /// # Errors
    /// Returns an error if the batch cannot be started.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            BatchCommands::Diff {
                guides,
                base,
                modded,
                destination,
                quiet,
            } => batch::diff(guides, base, modded, destination, *quiet),
            BatchCommands::Apply {
                base,
                commands,
                destination,
                stop_on_error,
                quiet,
            } => batch::apply(base, commands, destination, *stop_on_error, *quiet),
        }
    }
}
