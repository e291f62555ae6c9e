//! Node signatures and classification

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::formats::xml::Element;

/// How a node identifies itself among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Identified through the unique keys of its children
    UniqueNested,
    /// Whole subtree compared as one hash
    Atomic,
    /// Identified by a set of attributes
    UniqueKeys,
    /// Identified by tag alone
    UniqueTag,
    /// May repeat; identified by significant attributes plus a multiplicity
    NonUnique,
}

impl NodeType {
    /// Nodes whose subtree is hashed instead of recursed into.
    #[must_use]
    pub fn is_opaque(self) -> bool {
        matches!(self, Self::Atomic | Self::UniqueNested)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UniqueNested => "UNIQUE_NESTED",
            Self::Atomic => "ATOMIC",
            Self::UniqueKeys => "UNIQUE_KEYS",
            Self::UniqueTag => "UNIQUE_TAG",
            Self::NonUnique => "NON_UNIQUE",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNIQUE_NESTED" => Ok(Self::UniqueNested),
            "ATOMIC" => Ok(Self::Atomic),
            "UNIQUE_KEYS" => Ok(Self::UniqueKeys),
            "UNIQUE_TAG" => Ok(Self::UniqueTag),
            "NON_UNIQUE" => Ok(Self::NonUnique),
            other => Err(format!("unknown node type '{other}'")),
        }
    }
}

/// A pattern over tag, parent tag, attributes and child structure.
///
/// Every field is optional; an unset field places no constraint on the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSignature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tag: Option<String>,
    /// Attributes that together identify the node among its siblings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_keys: Option<Vec<String>>,
    /// Attributes identifying a non-unique node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significant_keys: Option<Vec<String>>,
    /// Attributes left out of comparison but kept in the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insignificant_keys: Option<Vec<String>>,
    /// Attributes stripped from the node before comparison
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_keys: Option<Vec<String>>,
    /// If any of these tags appears among the children, the node is atomic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_tags: Option<Vec<String>>,
    /// Nested signatures for nodes identified through their children
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeSignature>>,
}

impl NodeSignature {
    /// Signature constraining only the tag.
    #[must_use]
    pub fn for_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_unique_keys(mut self, keys: &[&str]) -> Self {
        self.unique_keys = Some(to_strings(keys));
        self
    }

    #[must_use]
    pub fn with_significant_keys(mut self, keys: &[&str]) -> Self {
        self.significant_keys = Some(to_strings(keys));
        self
    }

    #[must_use]
    pub fn with_insignificant_keys(mut self, keys: &[&str]) -> Self {
        self.insignificant_keys = Some(to_strings(keys));
        self
    }

    #[must_use]
    pub fn with_ignored_keys(mut self, keys: &[&str]) -> Self {
        self.ignored_keys = Some(to_strings(keys));
        self
    }

    #[must_use]
    pub fn with_children_tags(mut self, tags: &[&str]) -> Self {
        self.children_tags = Some(to_strings(tags));
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<NodeSignature>) -> Self {
        self.children = Some(children);
        self
    }

    #[must_use]
    pub fn with_parent_tag(mut self, parent_tag: impl Into<String>) -> Self {
        self.parent_tag = Some(parent_tag.into());
        self
    }

    /// Structural match against a node whose parent has tag `parent_tag`.
    ///
    /// Only tag, parent tag, keys and nested children take part.
    /// `children_tags` is left out on purpose: it only decides whether a
    /// matched node is [`NodeType::Atomic`] (see [`node_type`](Self::node_type)),
    /// so a node lacking those children still matches and is keyed as usual.
    #[must_use]
    pub fn matches(&self, element: &Element, parent_tag: Option<&str>) -> bool {
        if self.tag.as_deref().is_some_and(|t| t != element.tag) {
            return false;
        }
        if let Some(expected) = &self.parent_tag
            && parent_tag != Some(expected.as_str())
        {
            return false;
        }
        if let Some(keys) = &self.unique_keys
            && !keys.iter().all(|k| element.attr(k).is_some_and(|v| !v.is_empty()))
        {
            return false;
        }
        if let Some(keys) = &self.significant_keys
            && !keys.iter().all(|k| element.has_attr(k))
        {
            return false;
        }
        if let Some(nested) = &self.children {
            let children: Vec<&Element> = element.elements().collect();
            if children.len() < nested.len() {
                return false;
            }
            return nested
                .iter()
                .zip(children)
                .all(|(signature, child)| signature.matches(child, Some(&element.tag)));
        }
        true
    }

    /// Node type of an element this signature matched.
    ///
    /// `non_unique` is set for signatures taken from the guide's non-unique list.
    #[must_use]
    pub fn node_type(&self, element: &Element, non_unique: bool) -> NodeType {
        if non_unique {
            return NodeType::NonUnique;
        }
        if self.children.is_some() {
            return NodeType::UniqueNested;
        }
        if let Some(tags) = &self.children_tags
            && element.elements().any(|c| tags.contains(&c.tag))
        {
            return NodeType::Atomic;
        }
        if self.unique_keys.is_some() {
            return NodeType::UniqueKeys;
        }
        if self.tag.is_some() {
            return NodeType::UniqueTag;
        }
        NodeType::NonUnique
    }

    /// True if `name` takes no part in comparing two nodes of this signature.
    #[must_use]
    pub fn is_insignificant(&self, name: &str) -> bool {
        self.insignificant_keys.iter().flatten().any(|k| k == name)
            || self.ignored_keys.iter().flatten().any(|k| k == name)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
