//! Types for batch progress tracking

/// Progress callback type for batch operations
pub type BatchProgressCallback<'a> = &'a (dyn Fn(&BatchProgress) + Sync + Send);

/// Progress information during batch operations
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Current operation phase
    pub phase: BatchPhase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current file being processed (if applicable)
    pub current_file: Option<String>,
}

impl BatchProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: BatchPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with a file name
    #[must_use]
    pub fn with_file(phase: BatchPhase, current: usize, total: usize, file: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of a batch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    /// Walking the input directories
    Scanning,
    /// Diffing a file pair
    Diffing,
    /// Applying a command document
    Applying,
    /// Operation complete
    Complete,
}

impl BatchPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scanning => "Scanning files",
            Self::Diffing => "Diffing",
            Self::Applying => "Applying commands",
            Self::Complete => "Complete",
        }
    }
}

/// What happened to one file of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Output written
    Written,
    /// Nothing to write (no difference)
    Unchanged,
    /// Not processed (no counterpart or no guide)
    Skipped,
    /// Processed with errors
    Failed,
}

/// Result of a batch operation
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Number of files with output written or nothing to do
    pub success_count: usize,
    /// Number of files skipped
    pub skip_count: usize,
    /// Number of failed files
    pub fail_count: usize,
    /// Messages for each file processed, in path order
    pub results: Vec<String>,
}

impl BatchResult {
    pub(crate) fn collect(outcomes: Vec<(FileOutcome, String)>) -> Self {
        let mut result = Self::default();
        for (outcome, message) in outcomes {
            match outcome {
                FileOutcome::Written | FileOutcome::Unchanged => result.success_count += 1,
                FileOutcome::Skipped => result.skip_count += 1,
                FileOutcome::Failed => result.fail_count += 1,
            }
            result.results.push(message);
        }
        result
    }
}
