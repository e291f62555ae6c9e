//! File formats handled by `ModMerge`

pub mod xml;

pub use xml::{Element, Node, XmlDocument, parse_xml, parse_xml_str, read_xml, to_xml_string, write_xml};
