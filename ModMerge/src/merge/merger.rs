//! Replaying merge commands onto a base tree
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use std::borrow::Borrow;
use std::path::Path;

use indexmap::IndexMap;

use crate::command::{ActionType, Command, decode};
use crate::error::{Error, Result};
use crate::formats::xml::{Element, XmlDocument, is_transient, read_xml};
use crate::xpath::{Selector, XPath, descend_mut};

use super::types::{CommandFailure, CommandState, FailurePolicy, MergeOptions, MergeReport};

/// Applies command lists to base trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Merger {
    options: MergeOptions,
}

impl Merger {
    #[must_use]
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Apply commands in order.
    ///
    /// A failed command leaves the tree as it was before that command.
    ///
    /// # Errors
    /// With [`FailurePolicy::StopOnFirst`], returns [`Error::CommandFailed`]
    /// for the first command that fails. With [`FailurePolicy::Accumulate`]
    /// failures are recorded in the report instead.
    pub fn apply(&self, root: &mut Element, commands: &[Command]) -> Result<MergeReport> {
        self.run(root, commands.iter().map(Ok))
    }

    /// Decode a command document and apply it.
    ///
    /// Malformed command elements are failures of their own index.
    ///
    /// # Errors
    /// Returns [`Error::RootTagMismatch`] if the document targets another
    /// root, plus the errors of [`Merger::apply`].
    pub fn apply_document(&self, root: &mut Element, document: &Element) -> Result<MergeReport> {
        if root.tag != document.tag {
            return Err(Error::RootTagMismatch {
                expected: root.tag.clone(),
                found: document.tag.clone(),
            });
        }
        self.run(root, document.elements().map(decode))
    }

    /// Read a base file and a command file, and apply one to the other.
    ///
    /// The returned document keeps the base file's encoding.
    ///
    /// # Errors
    /// Returns an error if either file cannot be read, plus the errors of
    /// [`Merger::apply_document`].
    pub fn apply_files<P: AsRef<Path>>(&self, base: P, commands: P) -> Result<(XmlDocument, MergeReport)> {
        let mut base = read_xml(base)?;
        let commands = read_xml(commands)?;
        let report = self.apply_document(&mut base.root, &commands.root)?;
        Ok((base, report))
    }

    fn run<C, I>(&self, root: &mut Element, commands: I) -> Result<MergeReport>
    where
        C: Borrow<Command>,
        I: IntoIterator<Item = Result<C>>,
    {
        let mut report = MergeReport::default();

        for (index, item) in commands.into_iter().enumerate() {
            let mut state = CommandState::Unresolved;
            let (rendering, outcome) = match item {
                Ok(command) => {
                    let command = command.borrow();
                    (command.to_string(), apply_one(root, command, index, &mut state))
                }
                Err(e) => ("<undecodable>".to_string(), Err(e)),
            };

            match outcome {
                Ok(()) => {
                    advance(index, &mut state, CommandState::Applied);
                    tracing::debug!("Applied #{}: {}", index, rendering);
                    report.applied += 1;
                }
                Err(error) => {
                    // Only per-command failures are recoverable
                    let Some(kind) = error.failure_kind() else {
                        return Err(error);
                    };
                    advance(index, &mut state, CommandState::Failed(kind));
                    tracing::warn!("Command #{} ({}) failed: {}", index, rendering, error);

                    if self.options.failure_policy == FailurePolicy::StopOnFirst {
                        return Err(Error::CommandFailed {
                            index,
                            command: rendering,
                            source: Box::new(error),
                        });
                    }
                    report.failures.push(CommandFailure {
                        index,
                        command: rendering,
                        kind,
                        error,
                    });
                }
            }
            report.outcomes.push(state);
        }

        tracing::debug!("{}", report.summary());
        Ok(report)
    }
}

fn advance(index: usize, state: &mut CommandState, next: CommandState) {
    tracing::trace!("Command #{}: {} -> {}", index, state, next);
    *state = next;
}

/// Resolve, check, then mutate. Nothing is touched before every check passed.
fn apply_one(root: &mut Element, command: &Command, index: usize, state: &mut CommandState) -> Result<()> {
    check_selector_keys(command)?;
    let chain = resolve_parent(root, command)?;
    let parent = descend_mut(root, &chain).ok_or_else(|| Error::MergeTargetNotFound {
        target: command.parent_path.clone(),
        found: 0,
        expected: "a reachable parent",
    })?;
    advance(index, state, CommandState::ParentResolved);

    let selector = Selector::parse(&command.effective_selector())?;
    let matches = selector.matches(&parent.children);
    advance(index, state, CommandState::MatchesKnown { count: matches.len() });
    check_matches(command, matches.len())?;

    match command.action {
        ActionType::Add => parent.push(command.new_element()),
        ActionType::Replace => overwrite(parent, &matches, command),
        ActionType::AddOrReplace => {
            let desired = command.desired_count;
            // Ascending indices: removing from the back keeps the rest valid
            for &i in matches.iter().skip(desired).rev() {
                parent.remove_child(i);
            }
            overwrite(parent, &matches[..matches.len().min(desired)], command);
            for _ in matches.len()..desired {
                parent.push(command.new_element());
            }
        }
        ActionType::Modify | ActionType::ModifyOrFail => {
            for &i in &matches {
                if let Some(target) = parent.child_element_mut(i) {
                    for (key, value) in own_attrs(command) {
                        target.set_attr(key, value);
                    }
                }
            }
        }
        ActionType::Remove | ActionType::RemoveOrFail => {
            for &i in matches.iter().rev() {
                parent.remove_child(i);
            }
        }
    }
    Ok(())
}

/// Keyed selectors need every key among the command's attributes.
fn check_selector_keys(command: &Command) -> Result<()> {
    if let Some(missing) = command
        .resolved_selector_keys()
        .into_iter()
        .find(|k| !command.node_attrs.contains_key(*k))
    {
        return Err(Error::InvalidMergeCommand {
            tag: command.tag.clone(),
            line: 0,
            message: format!("selector key '{missing}' is not an attribute of the command"),
        });
    }
    Ok(())
}

/// Node-index chain to the parent element; empty for the root.
fn resolve_parent(root: &Element, command: &Command) -> Result<Vec<usize>> {
    if command.parent_path.is_empty() {
        return Ok(Vec::new());
    }
    let mut chains = XPath::parse(&command.parent_path)?.locate(root);
    match chains.len() {
        0 if command.action.creates_nodes() => {
            tracing::warn!("No parent '{}' for {}; adding under the root", command.parent_path, command);
            Ok(Vec::new())
        }
        0 => Err(Error::MergeTargetNotFound {
            target: command.parent_path.clone(),
            found: 0,
            expected: "a parent element",
        }),
        1 => Ok(chains.swap_remove(0)),
        count => Err(Error::AmbiguousMergeCommand {
            parent_path: command.parent_path.clone(),
            count,
        }),
    }
}

fn check_matches(command: &Command, found: usize) -> Result<()> {
    let expected = match command.action {
        ActionType::Add if found > 0 => "no existing match",
        ActionType::Replace | ActionType::ModifyOrFail if found != 1 => "exactly one required",
        ActionType::Modify | ActionType::RemoveOrFail if found == 0 => "at least one required",
        _ => return Ok(()),
    };
    Err(Error::MergeTargetNotFound {
        target: command.target(),
        found,
        expected,
    })
}

fn own_attrs(command: &Command) -> impl Iterator<Item = (String, String)> + '_ {
    command
        .node_attrs
        .iter()
        .filter(|(k, _)| !is_transient(k))
        .map(|(k, v)| (k.clone(), v.clone()))
}

fn overwrite(parent: &mut Element, matches: &[usize], command: &Command) {
    let attrs: IndexMap<String, String> = own_attrs(command).collect();
    for &i in matches {
        if let Some(target) = parent.child_element_mut(i) {
            target.overwrite_with(&attrs, command.text.as_deref(), &command.children_nodes);
        }
    }
}
