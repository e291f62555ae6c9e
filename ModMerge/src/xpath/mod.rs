//! Restricted XPath used by selectors and parent paths
//!
//! Only child steps are supported: a tag (or `*`), attribute equality and
//! existence predicates, 1-based positional predicates and `and`-joined
//! relative child paths. That is everything the annotator generates.
//!
//! ```
//! use modmerge::formats::Element;
//! use modmerge::xpath::Selector;
//!
//! let root = Element::new("R")
//!     .with_child(Element::new("A").with_attr("x", "1"))
//!     .with_child(Element::new("A").with_attr("x", "2"));
//!
//! let selector = Selector::parse("A[@x='2']")?;
//! assert_eq!(selector.matches(&root.children), vec![1]);
//! # Ok::<(), modmerge::Error>(())
//! ```

mod escape;
mod parser;

use std::fmt;

pub use escape::{attr_selector, escape, push_attr_predicate, unescape};
pub use parser::{NameTest, Predicate, Step, Term};

use crate::error::{Error, Result};
use crate::formats::xml::{Element, Node};
use parser::Parser;

/// A single-step selector naming children of a parent element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    step: Step,
}

impl Selector {
    /// Parse a selector such as `Object[@Name='Tree']`.
    ///
    /// # Errors
    /// Returns [`Error::SelectorSyntax`] if the text does not parse or has more than one step.
    pub fn parse(source: &str) -> Result<Self> {
        let mut steps = Parser::new(source).parse_path()?;
        if steps.len() != 1 {
            return Err(Error::SelectorSyntax {
                selector: source.to_string(),
                offset: 0,
                message: "a selector must be a single step".to_string(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            step: steps.remove(0),
        })
    }

    /// The selector text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Node indices (into `children`) of the elements this selector matches.
    #[must_use]
    pub fn matches(&self, children: &[Node]) -> Vec<usize> {
        select(&self.step, children)
    }

    /// Number of matching elements.
    #[must_use]
    pub fn count(&self, children: &[Node]) -> usize {
        self.matches(children).len()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A multi-step path from the document root, e.g. `Level[@id='1']/Objects`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    source: String,
    steps: Vec<Step>,
}

impl XPath {
    /// Parse a path.
    ///
    /// # Errors
    /// Returns [`Error::SelectorSyntax`] if the text does not parse.
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            steps: Parser::new(source).parse_path()?,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Elements reached by walking the steps down from `root`'s children.
    #[must_use]
    pub fn select<'a>(&self, root: &'a Element) -> Vec<&'a Element> {
        self.locate(root)
            .iter()
            .filter_map(|chain| descend(root, chain))
            .collect()
    }

    /// Like [`XPath::select`] but returns node-index chains, so callers can
    /// re-borrow the target mutably with [`descend_mut`].
    #[must_use]
    pub fn locate(&self, root: &Element) -> Vec<Vec<usize>> {
        let mut current: Vec<(Vec<usize>, &Element)> = vec![(Vec::new(), root)];
        for step in &self.steps {
            let mut next = Vec::new();
            for (chain, element) in &current {
                for index in select(step, &element.children) {
                    if let Some(child) = element.child_element(index) {
                        let mut chain = chain.clone();
                        chain.push(index);
                        next.push((chain, child));
                    }
                }
            }
            current = next;
        }
        current.into_iter().map(|(chain, _)| chain).collect()
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Follow a node-index chain down from `root`.
#[must_use]
pub fn descend<'a>(root: &'a Element, chain: &[usize]) -> Option<&'a Element> {
    chain
        .iter()
        .try_fold(root, |element, &index| element.child_element(index))
}

/// Mutable variant of [`descend`].
pub fn descend_mut<'a>(root: &'a mut Element, chain: &[usize]) -> Option<&'a mut Element> {
    chain
        .iter()
        .try_fold(root, |element, &index| element.child_element_mut(index))
}

fn select(step: &Step, children: &[Node]) -> Vec<usize> {
    let mut candidates: Vec<usize> = children
        .iter()
        .enumerate()
        .filter_map(|(i, node)| match node {
            Node::Element(e) if name_matches(&step.name, &e.tag) => Some(i),
            _ => None,
        })
        .collect();

    for predicate in &step.predicates {
        match predicate {
            Predicate::Position(n) => {
                candidates = candidates.get(n - 1).copied().into_iter().collect();
            }
            Predicate::All(terms) => {
                candidates.retain(|&i| {
                    children[i]
                        .as_element()
                        .is_some_and(|e| terms.iter().all(|t| term_holds(t, e)))
                });
            }
        }
        if candidates.is_empty() {
            break;
        }
    }
    candidates
}

fn name_matches(test: &NameTest, tag: &str) -> bool {
    match test {
        NameTest::Any => true,
        NameTest::Name(name) => name == tag,
    }
}

fn term_holds(term: &Term, element: &Element) -> bool {
    match term {
        Term::AttrEquals(key, value) => element.attr(key) == Some(value.as_str()),
        Term::AttrExists(key) => element.has_attr(key),
        Term::Path(steps) => path_exists(steps, element),
    }
}

fn path_exists(steps: &[Step], element: &Element) -> bool {
    let Some((first, rest)) = steps.split_first() else {
        return true;
    };
    select(first, &element.children)
        .into_iter()
        .filter_map(|i| element.child_element(i))
        .any(|child| path_exists(rest, child))
}
