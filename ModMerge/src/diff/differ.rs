//! The differ: pairs annotated nodes and yields merge commands

use std::collections::VecDeque;
use std::mem;

use crate::command::{Command, encode_document};
use crate::error::{Error, Result};
use crate::formats::xml::{Element, Node};
use crate::guide::{DiffGuide, SignatureIndex};
use crate::xpath::Selector;

use super::annotate::{AnnotationStats, Annotator, merge_selector};
use super::attrs::{DUPLICATE, PARENT_XPATH, SELECTOR};
use super::hash::equivalent;
use super::synthesis::{command_for, node_type_of};
use super::types::{Diff, DiffSummary};

/// Produces merge commands from two trees that share a root tag.
///
/// The guide is copied in and never mutated, so one differ can serve any
/// number of threads through a shared reference.
#[derive(Debug, Clone)]
pub struct Differ {
    guide: DiffGuide,
    index: SignatureIndex,
}

impl Differ {
    /// Validate the guide and build its lookup tables.
    ///
    /// # Errors
    /// Returns [`Error::IncorrectDiffGuide`] if the guide is invalid.
    pub fn new(guide: &DiffGuide) -> Result<Self> {
        guide.validate()?;
        Ok(Self {
            index: SignatureIndex::new(guide),
            guide: guide.clone(),
        })
    }

    #[must_use]
    pub fn guide(&self) -> &DiffGuide {
        &self.guide
    }

    /// Annotate a tree in place.
    ///
    /// # Errors
    /// See [`Annotator::annotate`].
    pub fn annotate(&self, tree: &mut Element) -> Result<AnnotationStats> {
        Annotator::new(&self.guide, &self.index).annotate(tree)
    }

    /// Diff two annotated trees.
    ///
    /// The children of both roots are moved into the returned iterator;
    /// matched nodes are dropped as soon as they are paired. Each item is a
    /// command, or `None` for a pair that needed none.
    ///
    /// # Errors
    /// Returns [`Error::RootTagMismatch`] if the roots differ in tag.
    pub fn diff(&self, base: &mut Element, modded: &mut Element) -> Result<Diffs> {
        if base.tag != modded.tag {
            return Err(Error::RootTagMismatch {
                expected: base.tag.clone(),
                found: modded.tag.clone(),
            });
        }
        Ok(Diffs {
            stack: vec![Frame::new(
                String::new(),
                mem::take(&mut base.children),
                mem::take(&mut modded.children),
            )],
            failed: false,
        })
    }

    /// Encode commands as a command document for `root_tag`.
    #[must_use]
    pub fn serialise(&self, commands: &[Command], root_tag: &str) -> Element {
        encode_document(commands, root_tag)
    }

    /// Annotate copies of both trees and collect every command.
    ///
    /// # Errors
    /// Returns the first annotation or diff error.
    pub fn diff_documents(&self, base: &Element, modded: &Element) -> Result<DiffSummary> {
        let mut base = base.clone();
        let mut modded = modded.clone();
        self.annotate(&mut base)?;
        self.annotate(&mut modded)?;

        let mut summary = DiffSummary {
            root_tag: base.tag.clone(),
            ..DiffSummary::default()
        };
        for item in self.diff(&mut base, &mut modded)? {
            match item? {
                Some(command) => summary.commands.push(command),
                None => summary.unchanged += 1,
            }
        }
        tracing::debug!("{summary}");
        Ok(summary)
    }
}

/// One parent pair under comparison.
struct Frame {
    /// Path to the base-side parent, as found in the base file
    path: String,
    left: Vec<Node>,
    right: VecDeque<Element>,
    leftover: Option<std::vec::IntoIter<Node>>,
}

impl Frame {
    /// Comments and nodes folded into a non-unique count take no part.
    fn new(path: String, left: Vec<Node>, right: Vec<Node>) -> Self {
        let keep = |node: Node| node.into_element().filter(|e| !e.has_attr(DUPLICATE));
        Self {
            path,
            left: left.into_iter().filter_map(keep).map(Node::Element).collect(),
            right: right.into_iter().filter_map(keep).collect(),
            leftover: None,
        }
    }
}

/// Lazy command sequence returned by [`Differ::diff`].
///
/// Fused after the first error. Dropping it releases the remaining nodes.
pub struct Diffs {
    stack: Vec<Frame>,
    failed: bool,
}

impl Diffs {
    /// Pair one right-hand node with its left-hand match.
    fn pair(&mut self, right: Element) -> Result<Option<Command>> {
        let selector_text = right.attr(SELECTOR).ok_or_else(|| Error::IncorrectSelector {
            tag: right.tag.clone(),
            line: right.line,
        })?;
        let selector = Selector::parse(selector_text)?;

        let Some(frame) = self.stack.last_mut() else {
            return Err(Error::invalid_diff("no frame to diff against"));
        };
        let path = frame.path.clone();
        let matches = selector.matches(&frame.left);
        let left = match matches.as_slice() {
            [] => None,
            [index] => frame.left.remove(*index).into_element(),
            many => {
                return Err(Error::invalid_diff(format!(
                    "selector '{selector}' matched {} base nodes; non-unique nodes should have been counted",
                    many.len()
                )));
            }
        };

        if let Some(mut left) = left {
            if equivalent(&left, &right) {
                if !node_type_of(&left)?.is_opaque() {
                    let mut right = right;
                    self.stack.push(Frame::new(
                        child_path(&left)?,
                        mem::take(&mut left.children),
                        mem::take(&mut right.children),
                    ));
                }
                return Ok(None);
            }
            return emit(&Diff::new(Some(left), Some(right))?, path);
        }
        emit(&Diff::new(None, Some(right))?, path)
    }

    fn step(&mut self) -> Option<Result<Option<Command>>> {
        loop {
            let frame = self.stack.last_mut()?;
            if let Some(right) = frame.right.pop_front() {
                return Some(self.pair(right));
            }
            let leftover = frame
                .leftover
                .get_or_insert_with(|| mem::take(&mut frame.left).into_iter());
            match leftover.next() {
                Some(Node::Element(left)) => {
                    let path = frame.path.clone();
                    return Some(Diff::new(Some(left), None).and_then(|diff| emit(&diff, path)));
                }
                Some(Node::Comment(_)) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Path under which the children of an annotated base node are found.
fn child_path(parent: &Element) -> Result<String> {
    let selector = merge_selector(parent).ok_or_else(|| Error::IncorrectSelector {
        tag: parent.tag.clone(),
        line: parent.line,
    })?;
    Ok(match parent.attr(PARENT_XPATH) {
        Some(path) if !path.is_empty() => format!("{path}/{selector}"),
        _ => selector.to_string(),
    })
}

/// Commands address the base tree, so the parent path always comes from
/// the base side of the enclosing pair.
fn emit(diff: &Diff, parent_path: String) -> Result<Option<Command>> {
    let mut command = command_for(diff)?;
    command.parent_path = parent_path;
    tracing::debug!("{} {}", diff.change_type, command);
    Ok(Some(command))
}

impl Iterator for Diffs {
    type Item = Result<Option<Command>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.step();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
            self.stack.clear();
        }
        item
    }
}

impl std::iter::FusedIterator for Diffs {}
