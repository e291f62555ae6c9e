//! Applying merge commands
//!
//! The [`Merger`] replays a command list, usually produced by the
//! [`Differ`](crate::diff::Differ), onto a base tree. Each command walks
//! `Unresolved → ParentResolved → MatchesKnown → Applied | Failed`; the
//! final states are collected in a [`MergeReport`].
//!
//! ```
//! use modmerge::command::{ActionType, Command};
//! use modmerge::formats::parse_xml_str;
//! use modmerge::merge::{MergeOptions, Merger};
//!
//! let mut base = parse_xml_str(r#"<R><A x="1"/></R>"#)?.root;
//!
//! let mut command = Command::new(ActionType::Add, "A");
//! command.node_attrs.insert("x".into(), "2".into());
//! command.selector_keys = vec!["x".into()];
//!
//! let report = Merger::new(MergeOptions::default()).apply(&mut base, &[command])?;
//! assert!(report.is_clean());
//! assert_eq!(base.element_count(), 2);
//! # Ok::<(), modmerge::Error>(())
//! ```

mod merger;
mod types;

pub use merger::Merger;
pub use types::{CommandFailure, CommandState, FailurePolicy, MergeOptions, MergeReport};
