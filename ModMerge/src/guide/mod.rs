//! Diff guides: per root tag, how nodes identify themselves
//!
//! A guide holds two ordered signature lists. Lookup for a node of tag `t`
//! considers the signatures whose `tag` is `t` (unique list first, then the
//! non-unique list, each in guide order) followed by the signatures without a
//! tag. The first one that matches wins. Nodes matching nothing are
//! `NON_UNIQUE` with every non-annotation attribute significant.

mod loader;
mod signature;

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

pub use loader::GuideSet;
pub use signature::{NodeSignature, NodeType};

use crate::error::{Error, Result};
use crate::formats::xml::Element;

/// Identity rules for documents with a given root tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiffGuide {
    pub root_tag: String,
    /// Attributes holding 3 or 4 floats that compare with rounding
    #[serde(default)]
    pub float_list_to_round: IndexSet<String>,
    #[serde(default)]
    pub unique_signatures: Vec<NodeSignature>,
    #[serde(default)]
    pub non_unique_signatures: Vec<NodeSignature>,
}

/// Result of matching a node against a guide.
#[derive(Debug, Clone, Copy)]
pub struct Classification<'g> {
    pub node_type: NodeType,
    /// The winning signature, `None` for the implicit non-unique fallback
    pub signature: Option<&'g NodeSignature>,
}

impl Classification<'_> {
    /// Attribute names that make up this node's selector.
    ///
    /// Unique keys for keyed and atomic nodes; significant keys (or every
    /// comparable attribute) for non-unique nodes; none otherwise.
    #[must_use]
    pub fn selector_keys(&self, element: &Element) -> Vec<String> {
        match self.node_type {
            NodeType::UniqueKeys | NodeType::Atomic => self
                .signature
                .and_then(|s| s.unique_keys.clone())
                .unwrap_or_default(),
            NodeType::NonUnique => match self.signature.and_then(|s| s.significant_keys.clone()) {
                Some(keys) => keys,
                None => element
                    .significant_attrs()
                    .map(|(k, _)| k)
                    .filter(|k| !self.signature.is_some_and(|s| s.is_insignificant(k)))
                    .map(String::from)
                    .collect(),
            },
            NodeType::UniqueNested | NodeType::UniqueTag => Vec::new(),
        }
    }
}

impl DiffGuide {
    #[must_use]
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            root_tag: root_tag.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_unique(mut self, signature: NodeSignature) -> Self {
        self.unique_signatures.push(signature);
        self
    }

    #[must_use]
    pub fn with_non_unique(mut self, signature: NodeSignature) -> Self {
        self.non_unique_signatures.push(signature);
        self
    }

    #[must_use]
    pub fn with_float_lists(mut self, names: &[&str]) -> Self {
        self.float_list_to_round.extend(names.iter().map(|s| (*s).to_string()));
        self
    }

    /// Check the structural invariants of every signature.
    ///
    /// # Errors
    /// Returns [`Error::IncorrectDiffGuide`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.root_tag.is_empty() {
            return Err(self.invalid("root_tag is empty"));
        }
        let all = self.unique_signatures.iter().chain(&self.non_unique_signatures);
        for (position, signature) in all.enumerate() {
            self.validate_signature(signature)
                .map_err(|message| self.invalid(format!("signature #{position}: {message}")))?;
        }
        Ok(())
    }

    fn validate_signature(&self, signature: &NodeSignature) -> std::result::Result<(), String> {
        let label = signature.tag.as_deref().unwrap_or("*");
        if signature.children.is_some() && signature.children_tags.is_some() {
            return Err(format!("<{label}> sets both children and children_tags"));
        }
        if let Some(children) = &signature.children {
            let [child] = children.as_slice() else {
                return Err(format!(
                    "<{label}> must have exactly one nested signature, found {}",
                    children.len()
                ));
            };
            if child.unique_keys.as_ref().is_none_or(Vec::is_empty) {
                return Err(format!("nested signature of <{label}> must set unique_keys"));
            }
            self.validate_signature(child)?;
        }
        let key_lists = [
            &signature.unique_keys,
            &signature.significant_keys,
            &signature.insignificant_keys,
            &signature.ignored_keys,
            &signature.children_tags,
        ];
        if key_lists.into_iter().flatten().flatten().any(String::is_empty) {
            return Err(format!("<{label}> lists an empty name"));
        }
        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::IncorrectDiffGuide {
            root_tag: self.root_tag.clone(),
            message: message.into(),
        }
    }

    /// True if `name` is rounded for comparison.
    #[must_use]
    pub fn is_float_list(&self, name: &str) -> bool {
        self.float_list_to_round.contains(name)
    }
}

#[derive(Debug, Clone, Copy)]
struct SignatureRef {
    non_unique: bool,
    index: usize,
}

/// Per-tag lookup table over a guide's signatures.
#[derive(Debug, Clone, Default)]
pub struct SignatureIndex {
    by_tag: HashMap<String, Vec<SignatureRef>>,
    wildcard: Vec<SignatureRef>,
}

impl SignatureIndex {
    #[must_use]
    pub fn new(guide: &DiffGuide) -> Self {
        let mut index = Self::default();
        let unique = guide.unique_signatures.iter().enumerate().map(|(i, s)| (false, i, s));
        let non_unique = guide.non_unique_signatures.iter().enumerate().map(|(i, s)| (true, i, s));
        for (non_unique, i, signature) in unique.chain(non_unique) {
            let entry = SignatureRef { non_unique, index: i };
            match &signature.tag {
                Some(tag) => index.by_tag.entry(tag.clone()).or_default().push(entry),
                None => index.wildcard.push(entry),
            }
        }
        index
    }

    /// Classify `element`, whose parent has tag `parent_tag`.
    #[must_use]
    pub fn classify<'g>(&self, guide: &'g DiffGuide, element: &Element, parent_tag: Option<&str>) -> Classification<'g> {
        let candidates = self
            .by_tag
            .get(&element.tag)
            .into_iter()
            .flatten()
            .chain(&self.wildcard);
        for entry in candidates {
            let signature = if entry.non_unique {
                &guide.non_unique_signatures[entry.index]
            } else {
                &guide.unique_signatures[entry.index]
            };
            if signature.matches(element, parent_tag) {
                return Classification {
                    node_type: signature.node_type(element, entry.non_unique),
                    signature: Some(signature),
                };
            }
        }
        Classification {
            node_type: NodeType::NonUnique,
            signature: None,
        }
    }
}
