//! Merge commands
//!
//! A [`Command`] is a declarative mutation of one set of siblings. Commands
//! are produced by the [`Differ`](crate::diff::Differ), stored as XML command
//! documents, and replayed by the [`Merger`](crate::merge::Merger).
//!
//! ```
//! use modmerge::command::{ActionType, Command, decode, encode};
//!
//! let mut command = Command::new(ActionType::Add, "A");
//! command.node_attrs.insert("x".into(), "2".into());
//! command.selector_keys = vec!["x".into()];
//! command.selector = command.effective_selector();
//!
//! let element = encode(&command);
//! assert_eq!(element.attr("_SelectorKeys"), Some("x"));
//! assert_eq!(decode(&element)?, command);
//! # Ok::<(), modmerge::Error>(())
//! ```

mod codec;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

pub use codec::{CommandDocument, decode, decode_document, encode, encode_document};

use crate::formats::xml::{Element, is_transient};
use crate::xpath::attr_selector;

/// Selector-key sentinel meaning "every attribute of the command".
pub const ALL_KEYS: &str = "*";

/// What a command does to the nodes its selector matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Append a node; fails if one already matches
    Add,
    /// Overwrite exactly one match
    Replace,
    /// Bring the match count to `desired_count`, then overwrite every match
    AddOrReplace,
    /// Update attributes of every match (at least one)
    Modify,
    /// Update attributes of exactly one match
    ModifyOrFail,
    /// Remove every match
    Remove,
    /// Remove every match, failing if there is none
    RemoveOrFail,
}

impl ActionType {
    pub const ALL: [ActionType; 7] = [
        Self::Add,
        Self::Replace,
        Self::AddOrReplace,
        Self::Modify,
        Self::ModifyOrFail,
        Self::Remove,
        Self::RemoveOrFail,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Replace => "Replace",
            Self::AddOrReplace => "AddOrReplace",
            Self::Modify => "Modify",
            Self::ModifyOrFail => "ModifyOrFail",
            Self::Remove => "Remove",
            Self::RemoveOrFail => "RemoveOrFail",
        }
    }

    /// Actions that may fall back to the root when the parent path matches nothing.
    #[must_use]
    pub fn creates_nodes(self) -> bool {
        matches!(self, Self::Add | Self::AddOrReplace)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

/// Cleaned copies of the nodes a command was derived from.
#[derive(Debug, Clone, Default)]
pub struct CommandPreview {
    pub source: Option<Element>,
    pub result: Option<Element>,
}

/// One merge instruction.
#[derive(Debug, Clone)]
pub struct Command {
    pub action: ActionType,
    /// Path from the root to the parent; empty for the root itself
    pub parent_path: String,
    /// Selector under the parent
    pub selector: String,
    /// Attribute names the selector is rebuilt from at apply time; `["*"]` means all
    pub selector_keys: Vec<String>,
    pub tag: String,
    pub node_attrs: IndexMap<String, String>,
    /// Text of the node, for commands that create or overwrite it
    pub text: Option<String>,
    pub children_nodes: Vec<Element>,
    /// Matching siblings wanted after an `AddOrReplace`
    pub desired_count: usize,
    /// Matching siblings on the base side when the command was made
    pub existing_count: usize,
    /// Not serialised and not compared
    pub preview: Option<CommandPreview>,
}

// Previews and the diagnostic existing_count are not part of a command's identity.
impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.parent_path == other.parent_path
            && self.selector == other.selector
            && self.selector_keys == other.selector_keys
            && self.tag == other.tag
            && self.node_attrs == other.node_attrs
            && self.text == other.text
            && self.children_nodes == other.children_nodes
            && self.desired_count == other.desired_count
    }
}

impl Command {
    /// An empty command for `tag`, selected by its tag alone.
    #[must_use]
    pub fn new(action: ActionType, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            action,
            parent_path: String::new(),
            selector: tag.clone(),
            selector_keys: Vec::new(),
            tag,
            node_attrs: IndexMap::new(),
            text: None,
            children_nodes: Vec::new(),
            desired_count: 1,
            existing_count: 1,
            preview: None,
        }
    }

    /// True if the selector keys are the `*` sentinel.
    #[must_use]
    pub fn uses_all_keys(&self) -> bool {
        matches!(self.selector_keys.as_slice(), [k] if k == ALL_KEYS)
    }

    /// Selector keys with the sentinel expanded to every non-annotation attribute.
    #[must_use]
    pub fn resolved_selector_keys(&self) -> Vec<&str> {
        if self.uses_all_keys() {
            self.node_attrs
                .keys()
                .filter(|k| !is_transient(k))
                .map(String::as_str)
                .collect()
        } else {
            self.selector_keys.iter().map(String::as_str).collect()
        }
    }

    /// Selector to run under the parent: rebuilt from the command's own
    /// attributes when selector keys are set, otherwise the literal selector.
    #[must_use]
    pub fn effective_selector(&self) -> String {
        if self.selector_keys.is_empty() {
            return self.selector.clone();
        }
        attr_selector(
            &self.tag,
            self.resolved_selector_keys()
                .into_iter()
                .filter_map(|k| self.node_attrs.get(k).map(|v| (k, v.as_str()))),
        )
    }

    /// A fresh element carrying the command's attributes, text and children.
    #[must_use]
    pub fn new_element(&self) -> Element {
        Element {
            tag: self.tag.clone(),
            attributes: self
                .node_attrs
                .iter()
                .filter(|(k, _)| !is_transient(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            text: self.text.clone(),
            children: self.children_nodes.iter().cloned().map(Into::into).collect(),
            line: 0,
        }
    }

    /// `parent/selector`, for logs and reports.
    #[must_use]
    pub fn target(&self) -> String {
        if self.parent_path.is_empty() {
            self.effective_selector()
        } else {
            format!("{}/{}", self.parent_path, self.effective_selector())
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.target())?;
        if self.desired_count != 1 {
            write!(f, " x{}", self.desired_count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keyed(keys: &[&str]) -> Command {
        let mut command = Command::new(ActionType::Modify, "A");
        command.node_attrs.insert("x".into(), "1".into());
        command.node_attrs.insert("y".into(), "it's".into());
        command.selector_keys = keys.iter().map(|k| (*k).to_string()).collect();
        command
    }

    #[test]
    fn test_action_names() {
        for action in ActionType::ALL {
            assert_eq!(action.as_str().parse::<ActionType>(), Ok(action));
        }
        assert!("add".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_effective_selector() {
        assert_eq!(keyed(&[]).effective_selector(), "A");
        assert_eq!(keyed(&["x"]).effective_selector(), "A[@x='1']");
        assert_eq!(keyed(&["*"]).effective_selector(), "A[@x='1'][@y='it&apos;s']");
    }

    #[test]
    fn test_display() {
        let mut command = keyed(&["x"]);
        command.parent_path = "L[@id='1']".into();
        assert_eq!(command.to_string(), "Modify L[@id='1']/A[@x='1']");
        command.desired_count = 3;
        assert_eq!(command.to_string(), "Modify L[@id='1']/A[@x='1'] x3");
    }

    #[test]
    fn test_equality_ignores_preview() {
        let a = keyed(&["x"]);
        let mut b = a.clone();
        b.preview = Some(CommandPreview::default());
        b.existing_count = 5;
        assert_eq!(a, b);
    }

    #[test]
    fn test_new_element() {
        let mut command = keyed(&["x"]);
        command.node_attrs.insert("_Selector".into(), "ignored".into());
        command.children_nodes.push(Element::new("C"));
        let element = command.new_element();
        assert_eq!(element.attributes.len(), 2);
        assert_eq!(element.element_count(), 1);
    }
}
