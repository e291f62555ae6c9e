//! In-memory XML element tree

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute names starting with this character carry annotation metadata
/// and are never serialised into game files or command documents.
pub const TRANSIENT_PREFIX: char = '_';

/// Returns true for annotation attribute names (`_Selector`, `_NodeType`, ...).
#[must_use]
pub fn is_transient(name: &str) -> bool {
    name.starts_with(TRANSIENT_PREFIX)
}

/// A child of an element: either an element or a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// An XML comment (content without the `<!--`/`-->` markers).
    Comment(String),
}

impl Node {
    /// The element, if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Comment(_) => None,
        }
    }

    /// Mutable access to the element, if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Comment(_) => None,
        }
    }

    /// Consumes the node, returning the element if it is one.
    #[must_use]
    pub fn into_element(self) -> Option<Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Comment(_) => None,
        }
    }

    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// An XML element.
///
/// Attributes keep their document order. Updating an existing attribute keeps
/// its position; new attributes are appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    /// Element name.
    pub tag: String,
    /// Attributes in document order.
    pub attributes: IndexMap<String, String>,
    /// Text content directly inside this element (concatenated if split by children).
    pub text: Option<String>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
    /// 1-based source line of the start tag, 0 for elements built in memory.
    #[serde(default)]
    pub line: usize,
}

// Source line numbers are diagnostics only and do not take part in equality.
// IndexMap equality is order-insensitive, which is what command round-trips need.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.attributes == other.attributes
            && self.text == other.text
            && self.children == other.children
    }
}

impl Element {
    /// Creates an empty element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Builder: add or update an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder: set text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Set an attribute, returning the previous value.
    ///
    /// An existing key keeps its position, a new key is appended.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Remove an attribute, preserving the order of the remaining ones.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// Attributes that are not annotation metadata.
    pub fn significant_attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter(|(k, _)| !is_transient(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Child elements, skipping comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Mutable child elements, skipping comments.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// Number of child elements (comments not counted).
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements().count()
    }

    #[must_use]
    pub fn has_element_children(&self) -> bool {
        self.children.iter().any(|n| !n.is_comment())
    }

    /// Append a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Append a comment.
    pub fn push_comment(&mut self, comment: impl Into<String>) {
        self.children.push(Node::Comment(comment.into()));
    }

    /// Insert a child element at a node index (clamped to the end).
    pub fn insert(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    /// Remove the child node at `index`.
    pub fn remove_child(&mut self, index: usize) -> Option<Node> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// The element at a node index, if that node is an element.
    #[must_use]
    pub fn child_element(&self, index: usize) -> Option<&Element> {
        self.children.get(index).and_then(Node::as_element)
    }

    /// Mutable element at a node index, if that node is an element.
    pub fn child_element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.children.get_mut(index).and_then(Node::as_element_mut)
    }

    /// Drop all comment children (not recursive).
    pub fn remove_comments(&mut self) {
        self.children.retain(|n| !n.is_comment());
    }

    /// Text with runs of whitespace collapsed to single spaces.
    #[must_use]
    pub fn normalized_text(&self) -> String {
        self.text
            .as_deref()
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    /// Remove every `_`-prefixed attribute from this element and its descendants.
    pub fn strip_transient(&mut self) {
        self.attributes.retain(|k, _| !is_transient(k));
        for child in self.elements_mut() {
            child.strip_transient();
        }
    }

    /// Replace attributes, text and children with those of `other`.
    ///
    /// Keys present on both keep their current position; keys only on `other`
    /// are appended in `other`'s order; keys missing from `other` are dropped.
    pub fn overwrite_with(&mut self, attrs: &IndexMap<String, String>, text: Option<&str>, children: &[Element]) {
        self.attributes.retain(|k, _| attrs.contains_key(k));
        for (k, v) in attrs {
            self.set_attr(k.clone(), v.clone());
        }
        self.text = text.map(String::from);
        self.children = children.iter().cloned().map(Node::Element).collect();
    }
}
