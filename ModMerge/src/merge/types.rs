//! Core types for merge operations

use std::fmt;

use crate::error::{Error, FailureKind};

/// What to do when a command fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the first failure as an error
    StopOnFirst,
    /// Record failures and keep applying
    #[default]
    Accumulate,
}

/// Options for merge operations
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub failure_policy: FailurePolicy,
}

impl MergeOptions {
    #[must_use]
    pub fn stop_on_first() -> Self {
        Self {
            failure_policy: FailurePolicy::StopOnFirst,
        }
    }
}

/// Where a command got to.
///
/// `Unresolved → ParentResolved → MatchesKnown → Applied | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Unresolved,
    /// Parent element located
    ParentResolved,
    /// Selector evaluated under the parent
    MatchesKnown { count: usize },
    Applied,
    Failed(FailureKind),
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::ParentResolved => write!(f, "parent resolved"),
            Self::MatchesKnown { count } => write!(f, "{count} match(es)"),
            Self::Applied => write!(f, "applied"),
            Self::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// A command that could not be applied.
#[derive(Debug)]
pub struct CommandFailure {
    /// Position in the command list
    pub index: usize,
    /// Rendering of the command
    pub command: String,
    pub kind: FailureKind,
    pub error: Error,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} [{}]: {}", self.index, self.command, self.kind, self.error)
    }
}

/// Result of applying a command list.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Number of commands applied
    pub applied: usize,
    pub failures: Vec<CommandFailure>,
    /// Final state of each command, by index
    pub outcomes: Vec<CommandState>,
}

impl MergeReport {
    /// True if every command applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} of {} command(s) applied, {} failed",
            self.applied,
            self.outcomes.len(),
            self.failures.len()
        )
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for failure in &self.failures {
            writeln!(f, "  {failure}")?;
        }
        Ok(())
    }
}
