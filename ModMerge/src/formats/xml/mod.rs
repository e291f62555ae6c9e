//! XML value layer: element tree, reader and writer

mod document;
mod reader;
mod writer;

pub use document::{Element, Node, TRANSIENT_PREFIX, is_transient};
pub use reader::{ReadOptions, parse_xml, parse_xml_str, parse_xml_with, read_xml};
pub use writer::{WriteOptions, serialize_xml, to_xml_string, write_xml};

use encoding_rs::Encoding;

/// A parsed XML document: its root element and the encoding it was read with.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// The root element.
    pub root: Element,
    /// Encoding detected from the BOM or declaration (UTF-8 when absent).
    pub encoding: &'static Encoding,
}

impl XmlDocument {
    /// Wrap an in-memory tree as a UTF-8 document.
    #[must_use]
    pub fn new(root: Element) -> Self {
        Self {
            root,
            encoding: encoding_rs::UTF_8,
        }
    }

    /// Writer options that reproduce the document's source encoding.
    #[must_use]
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::with_encoding(self.encoding)
    }
}
