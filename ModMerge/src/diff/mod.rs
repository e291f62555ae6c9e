//! Structural diff of XML game data
//!
//! Diffing runs in two phases. Both trees are first annotated against a
//! [`DiffGuide`](crate::guide::DiffGuide), which tags every node with its
//! selector, parent path and node type. The [`Differ`] then pairs right-hand
//! nodes with left-hand ones by selector and yields one [`Command`] per
//! difference.
//!
//! # Diffing Documents
//!
//! ```
//! use modmerge::diff::Differ;
//! use modmerge::formats::parse_xml_str;
//! use modmerge::guide::{DiffGuide, NodeSignature};
//!
//! let guide = DiffGuide::new("R").with_unique(NodeSignature::for_tag("A").with_unique_keys(&["x"]));
//! let differ = Differ::new(&guide)?;
//!
//! let base = parse_xml_str(r#"<R><A x="1"/></R>"#)?.root;
//! let modded = parse_xml_str(r#"<R><A x="1"/><A x="2"/></R>"#)?.root;
//!
//! let summary = differ.diff_documents(&base, &modded)?;
//! assert_eq!(summary.command_count(), 1);
//! println!("{}", summary.commands[0]);
//! # Ok::<(), modmerge::Error>(())
//! ```
//!
//! # Pulling Commands Lazily
//!
//! ```
//! # use modmerge::diff::Differ;
//! # use modmerge::formats::parse_xml_str;
//! # use modmerge::guide::DiffGuide;
//! # let differ = Differ::new(&DiffGuide::new("R"))?;
//! let mut base = parse_xml_str("<R><A/></R>")?.root;
//! let mut modded = parse_xml_str("<R><B/></R>")?.root;
//! differ.annotate(&mut base)?;
//! differ.annotate(&mut modded)?;
//!
//! for item in differ.diff(&mut base, &mut modded)? {
//!     if let Some(command) = item? {
//!         println!("{command}");
//!     }
//! }
//! # Ok::<(), modmerge::Error>(())
//! ```
//!
//! [`Command`]: crate::command::Command

pub mod attrs;
mod annotate;
mod differ;
mod hash;
mod synthesis;
mod types;

pub use annotate::{AnnotationStats, Annotator, clean, clean_in_place, merge_selector, round_float_list};
pub use differ::{Differ, Diffs};
pub use hash::{FLOAT_TOLERANCE, cached_children_hash, children_hash, equivalent, floats_close, script_text};
pub use synthesis::command_for;
pub use types::{ChangeType, Diff, DiffSummary};
