//! XML file writing
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use std::fs;
use std::io::Write;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::document::{Element, Node};
use crate::error::Result;

/// Options for XML writing
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Indentation as (character, count per level); `None` writes everything on one line
    pub indent: Option<(u8, usize)>,
    /// Output encoding, always named in the XML declaration
    pub encoding: &'static Encoding,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: Some((b'\t', 1)),
            encoding: UTF_8,
        }
    }
}

impl WriteOptions {
    /// Default layout with a specific output encoding.
    #[must_use]
    pub fn with_encoding(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }
}

/// Write an element tree to disk
///
/// # Errors
/// Returns an error if serialization or file writing fails.
pub fn write_xml<P: AsRef<Path>>(root: &Element, path: P, options: &WriteOptions) -> Result<()> {
    let bytes = serialize_xml(root, options)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Serialize an element tree to a UTF-8 string with default options
///
/// # Errors
/// Returns an error if XML serialization fails.
pub fn to_xml_string(root: &Element) -> Result<String> {
    let bytes = serialize_xml(root, &WriteOptions::default())?;
    Ok(String::from_utf8(bytes)?)
}

/// Serialize an element tree to bytes in the requested encoding
///
/// # Errors
/// Returns an error if XML serialization fails.
pub fn serialize_xml(root: &Element, options: &WriteOptions) -> Result<Vec<u8>> {
    let mut output = Vec::new();

    match options.indent {
        Some((ch, size)) => {
            let mut writer = Writer::new_with_indent(&mut output, ch, size);
            write_document(&mut writer, root, options.encoding)?;
        }
        None => {
            let mut writer = Writer::new(&mut output);
            write_document(&mut writer, root, options.encoding)?;
        }
    }

    if options.encoding == UTF_8 {
        return Ok(output);
    }

    // Characters the code page cannot represent become numeric character references
    let xml = String::from_utf8(output)?;
    let (encoded, _, _) = options.encoding.encode(&xml);
    Ok(encoded.into_owned())
}

fn write_document<W: Write>(writer: &mut Writer<W>, root: &Element, encoding: &'static Encoding) -> Result<()> {
    let label = if encoding == UTF_8 {
        "utf-8"
    } else {
        encoding.name()
    };
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some(label), None)))?;
    write_element(writer, root)
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    if text.is_none() && element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Comment(c) => writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.tag.as_str())))?;
    Ok(())
}
