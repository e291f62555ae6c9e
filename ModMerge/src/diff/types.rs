//! Core types for diff operations

use std::fmt;

use crate::command::{Command, encode_document};
use crate::error::{Error, Result};
use crate::formats::xml::Element;

/// Type of change detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Node only exists on the modded side
    Added,
    /// Node only exists on the base side
    Removed,
    /// Node exists on both sides but differs
    Modified,
    /// Node exists on both sides and is equivalent
    None,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "+"),
            Self::Removed => write!(f, "-"),
            Self::Modified => write!(f, "~"),
            Self::None => write!(f, "="),
        }
    }
}

/// One paired (or unpaired) node.
#[derive(Debug, Clone)]
pub struct Diff {
    pub change_type: ChangeType,
    /// Node from the base tree
    pub source: Option<Element>,
    /// Node from the modded tree
    pub result: Option<Element>,
}

impl Diff {
    /// Build a diff, classifying it from which sides are present.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDiff`] when both sides are absent.
    pub fn new(source: Option<Element>, result: Option<Element>) -> Result<Self> {
        let change_type = match (&source, &result) {
            (None, Some(_)) => ChangeType::Added,
            (Some(_), None) => ChangeType::Removed,
            (Some(_), Some(_)) => ChangeType::Modified,
            (None, None) => return Err(Error::invalid_diff("diff with neither source nor result node")),
        };
        Ok(Self {
            change_type,
            source,
            result,
        })
    }

    /// The node a command is built from: result for additions and
    /// modifications, source for removals.
    #[must_use]
    pub fn primary(&self) -> Option<&Element> {
        match self.change_type {
            ChangeType::Removed => self.source.as_ref(),
            _ => self.result.as_ref(),
        }
    }
}

/// Result of diffing two documents end to end.
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Root tag shared by both documents
    pub root_tag: String,
    /// Commands in emission order
    pub commands: Vec<Command>,
    /// Paired nodes that needed no command
    pub unchanged: usize,
}

impl DiffSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Encode the commands as a command document.
    #[must_use]
    pub fn to_document(&self) -> Element {
        encode_document(&self.commands, &self.root_tag)
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}>: {} command(s), {} unchanged node(s)",
            self.root_tag,
            self.commands.len(),
            self.unchanged
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_from_sides() {
        let a = || Some(Element::new("A"));
        assert_eq!(Diff::new(None, a()).unwrap().change_type, ChangeType::Added);
        assert_eq!(Diff::new(a(), None).unwrap().change_type, ChangeType::Removed);
        assert_eq!(Diff::new(a(), a()).unwrap().change_type, ChangeType::Modified);
        assert!(matches!(Diff::new(None, None), Err(Error::InvalidDiff { .. })));
    }

    #[test]
    fn test_primary_side() {
        let diff = Diff::new(Some(Element::new("Old")), None).unwrap();
        assert_eq!(diff.primary().map(|e| e.tag.as_str()), Some("Old"));
        let diff = Diff::new(Some(Element::new("Old")), Some(Element::new("New"))).unwrap();
        assert_eq!(diff.primary().map(|e| e.tag.as_str()), Some("New"));
    }
}
