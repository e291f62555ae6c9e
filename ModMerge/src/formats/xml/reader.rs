//! XML file reading
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT
//!
//! Game data files are mostly UTF-8, but older ones declare `windows-1251`.
//! quick-xml's `encoding` feature picks the decoder from the BOM or the
//! declaration; we only check that the declared label is one we know.

use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::document::{Element, Node};
use super::XmlDocument;
use crate::error::{Error, Result};

/// Options for XML reading
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Keep comments as [`Node::Comment`] children (default: true)
    pub keep_comments: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            keep_comments: true,
        }
    }
}

/// Read an XML file from disk
///
/// # Errors
/// Returns an error if the file cannot be read or has invalid XML.
pub fn read_xml<P: AsRef<Path>>(path: P) -> Result<XmlDocument> {
    let bytes = fs::read(path)?;
    parse_xml(&bytes)
}

/// Parse XML from raw bytes with default options
///
/// # Errors
/// Returns an error if the XML is malformed or uses an unknown encoding.
pub fn parse_xml(bytes: &[u8]) -> Result<XmlDocument> {
    parse_xml_with(bytes, &ReadOptions::default())
}

/// Parse XML from a string
///
/// # Errors
/// Returns an error if the XML is malformed.
pub fn parse_xml_str(content: &str) -> Result<XmlDocument> {
    parse_xml(content.as_bytes())
}

/// Parse XML from raw bytes
///
/// # Errors
/// Returns an error if the XML is malformed or uses an unknown encoding.
pub fn parse_xml_with(bytes: &[u8], options: &ReadOptions) -> Result<XmlDocument> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let lines = LineIndex::new(bytes);
    let mut encoding: &'static Encoding = UTF_8;
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        let end_pos = reader.buffer_position();
        match event {
            Ok(Event::Decl(decl)) => {
                if let Some(label) = decl.encoding() {
                    let label = label?;
                    encoding = Encoding::for_label(label.as_ref()).ok_or_else(|| {
                        Error::UnsupportedEncoding(String::from_utf8_lossy(&label).into_owned())
                    })?;
                    if encoding != UTF_8 {
                        tracing::debug!("Reading document declared as {}", encoding.name());
                    }
                }
            }
            Ok(Event::Start(e)) => {
                let line = lines.line_at(end_pos.saturating_sub(e.len() + 2));
                let element = start_element(&reader, &e, line)?;
                if root.is_some() && stack.is_empty() {
                    return Err(Error::MalformedXml {
                        line,
                        message: "more than one root element".to_string(),
                    });
                }
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let line = lines.line_at(end_pos.saturating_sub(e.len() + 3));
                let element = start_element(&reader, &e, line)?;
                close_element(element, &mut stack, &mut root, line)?;
            }
            Ok(Event::End(_)) => {
                let line = lines.line_at(end_pos);
                let Some(element) = stack.pop() else {
                    return Err(Error::MalformedXml {
                        line,
                        message: "unexpected closing tag".to_string(),
                    });
                };
                close_element(element, &mut stack, &mut root, line)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    append_text(current, &e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    let raw = e.into_inner();
                    append_text(current, &reader.decoder().decode(&raw)?);
                }
            }
            Ok(Event::Comment(e)) => {
                if options.keep_comments
                    && let Some(current) = stack.last_mut()
                {
                    let comment = reader.decoder().decode(&e)?.into_owned();
                    current.children.push(Node::Comment(comment));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(Error::MalformedXml {
            line: open.line,
            message: format!("element <{}> is never closed", open.tag),
        });
    }

    let root = root.ok_or_else(|| Error::MalformedXml {
        line: 0,
        message: "document has no root element".to_string(),
    })?;

    Ok(XmlDocument { root, encoding })
}

fn start_element<R>(reader: &Reader<R>, e: &BytesStart, line: usize) -> Result<Element> {
    let decoder = reader.decoder();
    let mut element = Element::new(decoder.decode(e.name().as_ref())?.into_owned());
    element.line = line;
    // Attribute checks are on by default, so duplicates surface as AttrError
    for attr in e.attributes() {
        let attr = attr?;
        let key = decoder.decode(attr.key.as_ref())?.into_owned();
        let value = attr.decode_and_unescape_value(reader)?.into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
    line: usize,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(Error::MalformedXml {
            line,
            message: "more than one root element".to_string(),
        });
    }
    Ok(())
}

fn append_text(element: &mut Element, text: &str) {
    if text.is_empty() {
        return;
    }
    match &mut element.text {
        Some(existing) => existing.push_str(text),
        None => element.text = Some(text.to_string()),
    }
}

/// Maps byte offsets to 1-based line numbers.
struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(bytes: &[u8]) -> Self {
        let newlines = bytes
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| (b == b'\n').then_some(i))
            .collect();
        Self { newlines }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&nl| nl < offset) + 1
    }
}
