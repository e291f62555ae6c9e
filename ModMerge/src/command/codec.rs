//! Command encoding and command documents
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT
//!
//! A command is stored as an element named after the node it targets. The
//! reserved attributes are `_Action`, `_ParentXPath`, `_Selector` or
//! `_SelectorKeys`, and `_DesiredCount` (omitted when 1); every other
//! attribute, the text and the children belong to the node itself.

use std::path::Path;

use crate::error::{Error, Result};
use crate::formats::xml::{Element, WriteOptions, XmlDocument, is_transient, read_xml, write_xml};

use super::{ActionType, Command};

const ACTION: &str = "_Action";
const PARENT_XPATH: &str = "_ParentXPath";
const SELECTOR: &str = "_Selector";
const SELECTOR_KEYS: &str = "_SelectorKeys";
const DESIRED_COUNT: &str = "_DesiredCount";

/// Encode a command as an element.
#[must_use]
pub fn encode(command: &Command) -> Element {
    let mut element = Element::new(command.tag.clone());
    element.set_attr(ACTION, command.action.as_str());
    if !command.parent_path.is_empty() {
        element.set_attr(PARENT_XPATH, command.parent_path.clone());
    }
    if command.selector_keys.is_empty() {
        element.set_attr(SELECTOR, command.selector.clone());
    } else {
        element.set_attr(SELECTOR_KEYS, command.selector_keys.join(","));
    }
    if command.desired_count != 1 {
        element.set_attr(DESIRED_COUNT, command.desired_count.to_string());
    }
    for (key, value) in &command.node_attrs {
        if !is_transient(key) {
            element.set_attr(key.clone(), value.clone());
        }
    }
    element.text.clone_from(&command.text);
    for child in &command.children_nodes {
        element.push(child.clone());
    }
    element
}

/// Decode a command element.
///
/// # Errors
/// Returns [`Error::InvalidMergeCommand`] if `_Action` is missing or unknown,
/// both `_Selector` and `_SelectorKeys` are missing, or `_DesiredCount` is not
/// a positive integer.
pub fn decode(element: &Element) -> Result<Command> {
    let invalid = |message: String| Error::InvalidMergeCommand {
        tag: element.tag.clone(),
        line: element.line,
        message,
    };

    let action: ActionType = element
        .attr(ACTION)
        .ok_or_else(|| invalid(format!("missing {ACTION}")))?
        .parse()
        .map_err(invalid)?;

    let desired_count = match element.attr(DESIRED_COUNT) {
        None => 1,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => return Err(invalid(format!("{DESIRED_COUNT} '{raw}' is not a positive integer"))),
        },
    };

    let mut command = Command::new(action, element.tag.clone());
    command.parent_path = element.attr(PARENT_XPATH).unwrap_or_default().to_string();
    command.desired_count = desired_count;
    command.node_attrs = element
        .significant_attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    command.text = element.text.clone().filter(|t| !t.is_empty());
    command.children_nodes = element.elements().cloned().collect();

    match (element.attr(SELECTOR_KEYS), element.attr(SELECTOR)) {
        (Some(keys), _) => {
            command.selector_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
            if command.selector_keys.is_empty() {
                return Err(invalid(format!("{SELECTOR_KEYS} is empty")));
            }
            command.selector = command.effective_selector();
        }
        (None, Some(selector)) => command.selector = selector.to_string(),
        (None, None) => return Err(invalid(format!("missing both {SELECTOR} and {SELECTOR_KEYS}"))),
    }
    Ok(command)
}

/// Wrap commands in a document whose root tag is the base document's.
#[must_use]
pub fn encode_document(commands: &[Command], root_tag: &str) -> Element {
    let mut root = Element::new(root_tag);
    for command in commands {
        root.push(encode(command));
    }
    root
}

/// Decode every command of a document, stopping at the first malformed one.
///
/// # Errors
/// Returns the first decoding error.
pub fn decode_document(document: &Element) -> Result<Vec<Command>> {
    document.elements().map(decode).collect()
}

/// A command document on disk: target root tag plus commands.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDocument {
    pub root_tag: String,
    pub commands: Vec<Command>,
}

impl CommandDocument {
    #[must_use]
    pub fn new(root_tag: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            root_tag: root_tag.into(),
            commands,
        }
    }

    /// # Errors
    /// Returns an error if any command element is malformed.
    pub fn from_element(root: &Element) -> Result<Self> {
        Ok(Self::new(root.tag.clone(), decode_document(root)?))
    }

    #[must_use]
    pub fn to_element(&self) -> Element {
        encode_document(&self.commands, &self.root_tag)
    }

    /// Read and decode a command document.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or decoded.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let XmlDocument { root, .. } = read_xml(path)?;
        Self::from_element(&root)
    }

    /// Encode and write a command document.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn write<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> Result<()> {
        write_xml(&self.to_element(), path, options)
    }
}
