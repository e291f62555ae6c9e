//! # `ModMerge`
//!
//! Structural diff and merge for XML game data.
//!
//! A mod usually ships whole copies of the game's XML files. `ModMerge`
//! turns such a copy into a short list of merge commands against the
//! vanilla file, and replays command lists onto a base file, so several
//! mods touching the same file can be combined.
//!
//! How nodes are identified is described per root tag by a
//! [`DiffGuide`](guide::DiffGuide): which attributes key a node, which
//! subtrees are compared as a whole, and which nodes may repeat.
//!
//! ## Quick Start
//!
//! ```
//! use modmerge::prelude::*;
//!
//! let guide = DiffGuide::new("Objects")
//!     .with_unique(NodeSignature::for_tag("Object").with_unique_keys(&["id"]));
//! let differ = Differ::new(&guide)?;
//!
//! let base = parse_xml_str(r#"<Objects><Object id="a" hp="10"/></Objects>"#)?.root;
//! let modded = parse_xml_str(r#"<Objects><Object id="a" hp="20"/></Objects>"#)?.root;
//!
//! // Diff into commands
//! let summary = differ.diff_documents(&base, &modded)?;
//! assert_eq!(summary.command_count(), 1);
//!
//! // Replay them onto another copy of the base
//! let mut merged = base.clone();
//! let report = Merger::default().apply(&mut merged, &summary.commands)?;
//! assert!(report.is_clean());
//! assert_eq!(merged, modded);
//! # Ok::<(), modmerge::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `modmerge` command-line binary

pub mod batch;
pub mod command;
pub mod diff;
pub mod error;
pub mod formats;
pub mod guide;
pub mod merge;
pub mod xpath;

// Re-exports for convenience
pub use error::{Error, FailureKind, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, FailureKind, Result};
    pub use crate::formats::xml::{Element, Node, XmlDocument, parse_xml, parse_xml_str, read_xml, to_xml_string, write_xml};

    pub use crate::guide::{DiffGuide, GuideSet, NodeSignature, NodeType};
    pub use crate::diff::{Differ, DiffSummary};
    pub use crate::command::{ActionType, Command, CommandDocument};
    pub use crate::merge::{FailurePolicy, MergeOptions, MergeReport, Merger};

    pub use crate::batch::{BatchResult, apply_directory, diff_directories, find_xml_files};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
