//! Error types for `ModMerge`

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The error type for `ModMerge` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Diff Errors ====================
    /// A differ invariant was violated (e.g. both sides of a diff absent).
    #[error("invalid diff: {message}")]
    InvalidDiff {
        /// What went wrong.
        message: String,
    },

    /// A node lacks the `_Selector` annotation where one was required.
    #[error("node <{tag}> (line {line}) has no selector annotation")]
    IncorrectSelector {
        /// Tag of the offending node.
        tag: String,
        /// Source line of the offending node (0 when unknown).
        line: usize,
    },

    /// The diff guide violates its invariants, or a nested selector cannot be built.
    #[error("incorrect diff guide for <{root_tag}>: {message}")]
    IncorrectDiffGuide {
        /// Root tag of the guide.
        root_tag: String,
        /// Description of the violation.
        message: String,
    },

    /// No guide is registered for the document's root tag.
    #[error("no diff guide for root tag <{0}>")]
    NoGuideForRoot(String),

    /// The two documents (or a document and a guide) disagree on the root tag.
    #[error("root tag mismatch: expected <{expected}>, found <{found}>")]
    RootTagMismatch {
        /// The root tag that was expected.
        expected: String,
        /// The root tag that was found.
        found: String,
    },

    // ==================== Selector Errors ====================
    /// A selector or parent path could not be parsed.
    #[error("invalid selector '{selector}' at offset {offset}: {message}")]
    SelectorSyntax {
        /// The selector text.
        selector: String,
        /// Byte offset of the problem.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    // ==================== Merge Errors ====================
    /// A serialised command is malformed.
    #[error("invalid merge command <{tag}> (line {line}): {message}")]
    InvalidMergeCommand {
        /// Tag of the command element.
        tag: String,
        /// Source line of the command element (0 when unknown).
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The parent path of a command matched more than one element.
    #[error("ambiguous merge command: parent path '{parent_path}' matched {count} elements")]
    AmbiguousMergeCommand {
        /// The parent path.
        parent_path: String,
        /// Number of matches found.
        count: usize,
    },

    /// A strict action did not find the number of matches it requires.
    #[error("merge target not found: '{target}' ({found} match(es), {expected})")]
    MergeTargetNotFound {
        /// The parent path or selector that was resolved.
        target: String,
        /// Number of matches found.
        found: usize,
        /// Human readable precondition, e.g. "exactly one required".
        expected: &'static str,
    },

    /// A command failed while applying a command list.
    #[error("command #{index} ({command}) failed: {source}")]
    CommandFailed {
        /// Index of the command in the applied list.
        index: usize,
        /// Short rendering of the command.
        command: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    // ==================== Parsing Errors ====================
    /// XML parse error.
    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// XML attribute error.
    #[error("XML attribute error: {0}")]
    XmlAttrError(String),

    /// Structural problem in an XML document (unbalanced tags, no root, ...).
    #[error("malformed XML (line {line}): {message}")]
    MalformedXml {
        /// Source line where the problem was detected.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The document declares an encoding we cannot handle.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    // ==================== File System Errors ====================
    /// Invalid file path.
    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

impl Error {
    /// Classify a per-command failure, if this error is one.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::InvalidMergeCommand { .. } => Some(FailureKind::InvalidMergeCommand),
            Error::AmbiguousMergeCommand { .. } => Some(FailureKind::AmbiguousMergeCommand),
            Error::MergeTargetNotFound { .. } => Some(FailureKind::MergeTargetNotFound),
            Error::SelectorSyntax { .. } => Some(FailureKind::SelectorSyntax),
            Error::CommandFailed { source, .. } => source.failure_kind(),
            _ => None,
        }
    }

    pub(crate) fn invalid_diff(message: impl Into<String>) -> Self {
        Error::InvalidDiff {
            message: message.into(),
        }
    }
}

/// The kinds of failure a single merge command can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The command itself is malformed.
    InvalidMergeCommand,
    /// More than one parent matched.
    AmbiguousMergeCommand,
    /// A strict action saw the wrong number of matches.
    MergeTargetNotFound,
    /// The selector or parent path does not parse.
    SelectorSyntax,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMergeCommand => write!(f, "InvalidMergeCommand"),
            Self::AmbiguousMergeCommand => write!(f, "AmbiguousMergeCommand"),
            Self::MergeTargetNotFound => write!(f, "MergeTargetNotFound"),
            Self::SelectorSyntax => write!(f, "SelectorSyntax"),
        }
    }
}

// Add conversion from quick_xml::events::attributes::AttrError
impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttrError(err.to_string())
    }
}

// Add conversion from walkdir::Error
impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `ModMerge` operations.
pub type Result<T> = std::result::Result<T, Error>;
