//! Tree annotation
//!
//! Annotation decorates every reachable element with `_`-prefixed metadata
//! (see [`attrs`](super::attrs)) so the differ can pair nodes by selector and
//! compare them without consulting the guide again.

use crate::error::{Error, Result};
use crate::formats::xml::{Element, is_transient};
use crate::guide::{Classification, DiffGuide, NodeType, SignatureIndex};
use crate::xpath::{Selector, attr_selector, push_attr_predicate};

use super::attrs::{
    self, CHILDREN_HASH, DUPLICATE, DUPLICATE_COUNT, FLOAT_LISTS, INSIGNIFICANT_KEYS, MERGE_SELECTOR, NODE_TYPE,
    PARENT_XPATH, SELECTOR, SELECTOR_KEYS,
};
use super::hash::children_hash;

/// Counters from one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationStats {
    /// Elements that received a node type
    pub nodes: usize,
    /// Non-unique siblings folded into an earlier node's count
    pub duplicates: usize,
    /// Atomic and nested nodes whose subtree was hashed
    pub hashed: usize,
}

/// Walks a tree and writes annotation attributes.
pub struct Annotator<'g> {
    guide: &'g DiffGuide,
    index: &'g SignatureIndex,
}

impl<'g> Annotator<'g> {
    pub fn new(guide: &'g DiffGuide, index: &'g SignatureIndex) -> Self {
        Self { guide, index }
    }

    /// Annotate a whole document. A root that already carries `_NodeType`
    /// is left untouched.
    ///
    /// # Errors
    /// Returns [`Error::RootTagMismatch`] if the root tag is not the guide's,
    /// or [`Error::IncorrectDiffGuide`] if a nested selector cannot be built.
    pub fn annotate(&self, root: &mut Element) -> Result<AnnotationStats> {
        if root.tag != self.guide.root_tag {
            return Err(Error::RootTagMismatch {
                expected: self.guide.root_tag.clone(),
                found: root.tag.clone(),
            });
        }
        let mut stats = AnnotationStats::default();
        if root.has_attr(NODE_TYPE) {
            return Ok(stats);
        }

        root.set_attr(SELECTOR, root.tag.clone());
        root.set_attr(NODE_TYPE, NodeType::UniqueTag.as_str());
        stats.nodes += 1;
        self.annotate_children(root, "", &mut stats)?;

        tracing::debug!(
            "Annotated <{}>: {} nodes, {} duplicates, {} hashed subtrees",
            root.tag,
            stats.nodes,
            stats.duplicates,
            stats.hashed
        );
        Ok(stats)
    }

    fn annotate_children(&self, parent: &mut Element, parent_path: &str, stats: &mut AnnotationStats) -> Result<()> {
        parent.remove_comments();
        for child in parent.elements_mut() {
            if !child.has_attr(NODE_TYPE) {
                self.round_float_lists(child);
            }
        }

        let parent_tag = parent.tag.clone();
        for i in 0..parent.children.len() {
            let Some(child) = parent.child_element(i) else {
                continue;
            };
            if child.has_attr(NODE_TYPE) || child.has_attr(DUPLICATE) {
                continue;
            }

            let class = self.index.classify(self.guide, child, Some(&parent_tag));
            let keys = class.selector_keys(child);
            let selector = self.selector_for(&class, child, &keys, Values::Rounded)?;
            let merge_selector = if child.has_attr(FLOAT_LISTS) {
                self.selector_for(&class, child, &keys, Values::Original)?
            } else {
                selector.clone()
            };
            tracing::trace!("<{}> line {}: {} {}", child.tag, child.line, class.node_type, selector);

            let duplicate_count = if class.node_type == NodeType::NonUnique {
                Some(mark_duplicates(parent, i, &selector, stats)?)
            } else {
                None
            };

            let Some(child) = parent.child_element_mut(i) else {
                continue;
            };
            if let Some(ignored) = class.signature.and_then(|s| s.ignored_keys.as_ref()) {
                for key in ignored {
                    child.remove_attr(key);
                }
            }
            if let Some(insignificant) = class.signature.and_then(|s| s.insignificant_keys.as_ref())
                && !insignificant.is_empty()
            {
                child.set_attr(INSIGNIFICANT_KEYS, insignificant.join(","));
            }
            if let Some(count) = duplicate_count {
                child.set_attr(DUPLICATE_COUNT, count.to_string());
            }

            child.set_attr(PARENT_XPATH, parent_path);
            child.set_attr(NODE_TYPE, class.node_type.as_str());
            child.set_attr(SELECTOR_KEYS, keys.join(","));
            stats.nodes += 1;

            if class.node_type.is_opaque() {
                let hash = children_hash(child);
                child.set_attr(CHILDREN_HASH, hash);
                stats.hashed += 1;
            } else {
                let path = if parent_path.is_empty() {
                    merge_selector.clone()
                } else {
                    format!("{parent_path}/{merge_selector}")
                };
                self.annotate_children(child, &path, stats)?;
            }
            if merge_selector != selector {
                child.set_attr(MERGE_SELECTOR, merge_selector);
            }
            child.set_attr(SELECTOR, selector);
        }
        Ok(())
    }

    fn selector_for(
        &self,
        class: &Classification<'_>,
        element: &Element,
        keys: &[String],
        values: Values,
    ) -> Result<String> {
        match class.node_type {
            NodeType::UniqueTag => Ok(element.tag.clone()),
            NodeType::UniqueKeys | NodeType::Atomic | NodeType::NonUnique => {
                let present: Vec<(&str, &str)> = keys
                    .iter()
                    .filter_map(|k| {
                        let value = match values {
                            Values::Rounded => element.attr(k),
                            Values::Original => unrounded_attr(element, k),
                        };
                        value.map(|v| (k.as_str(), v))
                    })
                    .collect();
                if values == Values::Rounded && present.len() < keys.len() {
                    tracing::warn!(
                        "<{}> (line {}) is missing some of its keys {:?}",
                        element.tag,
                        element.line,
                        keys
                    );
                }
                Ok(attr_selector(&element.tag, present))
            }
            NodeType::UniqueNested => self.nested_selector(class, element),
        }
    }

    /// `tag[C[1][@k='v'] and C[2][@k='w']]`, one term per child element.
    fn nested_selector(&self, class: &Classification<'_>, element: &Element) -> Result<String> {
        let child_keys = class
            .signature
            .and_then(|s| s.children.as_ref())
            .and_then(|c| c.first())
            .and_then(|c| c.unique_keys.as_ref());
        let Some(child_keys) = child_keys else {
            return Err(self.incorrect(format!("<{}> has no nested unique keys", element.tag)));
        };

        let mut positions: Vec<(&str, usize)> = Vec::new();
        let mut terms = Vec::new();
        for child in element.elements() {
            let position = match positions.iter_mut().find(|(tag, _)| *tag == child.tag) {
                Some((_, n)) => {
                    *n += 1;
                    *n
                }
                None => {
                    positions.push((&child.tag, 1));
                    1
                }
            };
            let mut term = format!("{}[{position}]", child.tag);
            for key in child_keys {
                let Some(value) = child.attr(key) else {
                    return Err(self.incorrect(format!(
                        "<{}> (line {}) lacks unique key '{key}' needed by parent <{}>",
                        child.tag, child.line, element.tag
                    )));
                };
                push_attr_predicate(&mut term, key, value);
            }
            terms.push(term);
        }
        Ok(format!("{}[{}]", element.tag, terms.join(" and ")))
    }

    /// Round the guide's float-list attributes, keeping originals under `_<name>`.
    fn round_float_lists(&self, element: &mut Element) {
        let mut rounded = Vec::new();
        for name in &self.guide.float_list_to_round {
            let Some(value) = element.attr(name) else {
                continue;
            };
            let Some(short) = round_float_list(value) else {
                continue;
            };
            let original = element.set_attr(name.clone(), short).unwrap_or_default();
            element.set_attr(attrs::original(name), original);
            rounded.push(name.as_str());
        }
        if !rounded.is_empty() {
            element.set_attr(FLOAT_LISTS, rounded.join(","));
        }
    }

    fn incorrect(&self, message: String) -> Error {
        Error::IncorrectDiffGuide {
            root_tag: self.guide.root_tag.clone(),
            message,
        }
    }
}

/// Which values of rounded float-list attributes a selector is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Values {
    /// Rounded, for pairing nodes across two annotated trees
    Rounded,
    /// As found in the file, for paths applied to unannotated trees
    Original,
}

/// Value of `name` as it was before rounding.
fn unrounded_attr<'e>(element: &'e Element, name: &str) -> Option<&'e str> {
    let rounded = element
        .attr(FLOAT_LISTS)
        .is_some_and(|list| attrs::split_list(list).any(|n| n == name));
    if rounded {
        element.attr(&attrs::original(name))
    } else {
        element.attr(name)
    }
}

/// Selector that finds the node in the unannotated tree it came from.
#[must_use]
pub fn merge_selector(element: &Element) -> Option<&str> {
    element.attr(MERGE_SELECTOR).or_else(|| element.attr(SELECTOR))
}

/// Count the siblings `selector` matches and mark the not yet annotated ones
/// after `own` as duplicates. Returns the total match count.
fn mark_duplicates(parent: &mut Element, own: usize, selector: &str, stats: &mut AnnotationStats) -> Result<usize> {
    let matches = Selector::parse(selector)?.matches(&parent.children);
    for &index in &matches {
        if index == own {
            continue;
        }
        if let Some(sibling) = parent.child_element_mut(index)
            && !sibling.has_attr(NODE_TYPE)
            && !sibling.has_attr(DUPLICATE)
        {
            sibling.set_attr(DUPLICATE, "True");
            stats.duplicates += 1;
        }
    }
    Ok(matches.len().max(1))
}

/// Round each component to one decimal; `None` unless the value holds 3 or 4 numbers.
#[must_use]
pub fn round_float_list(value: &str) -> Option<String> {
    let parts: Vec<f64> = value
        .split_whitespace()
        .map(|p| p.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<_>>()?;
    if !(3..=4).contains(&parts.len()) {
        return None;
    }
    let rounded: Vec<String> = parts
        .iter()
        .map(|v| {
            let r = (v * 10.0).round() / 10.0;
            // -0.0 prints as "-0.0"
            let r = if r == 0.0 { 0.0 } else { r };
            format!("{r:.1}")
        })
        .collect();
    Some(rounded.join(" "))
}

/// Copy of an annotated element with float-list originals restored and every
/// annotation attribute removed, recursively.
#[must_use]
pub fn clean(element: &Element) -> Element {
    let mut copy = element.clone();
    clean_in_place(&mut copy);
    copy
}

/// In-place variant of [`clean`].
pub fn clean_in_place(element: &mut Element) {
    if let Some(list) = element.attr(FLOAT_LISTS).map(String::from) {
        for name in attrs::split_list(&list) {
            if let Some(original) = element.attr(&attrs::original(name)).map(String::from) {
                element.set_attr(name, original);
            }
        }
    }
    element.attributes.retain(|k, _| !is_transient(k));
    for child in element.elements_mut() {
        clean_in_place(child);
    }
}
