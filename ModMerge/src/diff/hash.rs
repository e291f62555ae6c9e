//! Children hash and node equivalence
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::formats::xml::Element;

use super::attrs::{self, CHILDREN_HASH, DUPLICATE_COUNT, FLOAT_LISTS, INSIGNIFICANT_KEYS};

/// Per-component tolerance for float-list attributes.
pub const FLOAT_TOLERANCE: f64 = 0.05;

/// Fingerprint of an element's subtree, excluding annotation attributes.
///
/// Two elements hash equal iff their children agree on tags, sorted
/// attributes, normalised text and, recursively, their own children.
#[must_use]
pub fn children_hash(element: &Element) -> String {
    let mut hasher = md5::Context::new();
    feed_children(&mut hasher, element);
    format!("{:x}", hasher.compute())
}

/// The stored `_ChildrenHash`, or a freshly computed one.
#[must_use]
pub fn cached_children_hash(element: &Element) -> String {
    element
        .attr(CHILDREN_HASH)
        .map_or_else(|| children_hash(element), String::from)
}

fn feed_children(hasher: &mut md5::Context, element: &Element) {
    for child in element.elements() {
        hasher.consume(child.tag.as_bytes());

        let mut attributes: Vec<(&str, &str)> = child.significant_attrs().collect();
        attributes.sort_unstable();
        for (key, value) in attributes {
            hasher.consume(b"\x1f");
            hasher.consume(key.as_bytes());
            hasher.consume(b"=");
            hasher.consume(value.as_bytes());
        }

        hasher.consume(b"\x1e");
        hasher.consume(script_text(child.text.as_deref().unwrap_or_default()).as_bytes());

        if child.has_element_children() {
            hasher.consume(b"{");
            feed_children(hasher, child);
            hasher.consume(b"}");
        }
        hasher.consume(b"\x1d");
    }
}

/// Text with blank lines and `--` comment lines removed.
#[must_use]
pub fn script_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a float list and compare component-wise within [`FLOAT_TOLERANCE`].
#[must_use]
pub fn floats_close(a: &str, b: &str) -> bool {
    let parse = |s: &str| -> Option<Vec<f64>> { s.split_whitespace().map(|p| p.parse().ok()).collect() };
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .zip(&y)
                    .all(|(p, q)| (p - q).abs() <= FLOAT_TOLERANCE + 1e-9)
        }
        _ => a == b,
    }
}

/// Names listed in a comma-joined annotation.
fn listed<'a>(element: &'a Element, name: &str) -> BTreeSet<&'a str> {
    element.attr(name).map(|v| attrs::split_list(v).collect()).unwrap_or_default()
}

/// Value of a float-list attribute before rounding.
pub(crate) fn float_original<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element
        .attributes
        .get(&attrs::original(name))
        .or_else(|| element.attributes.get(name))
        .map(String::as_str)
}

/// Equivalence of two annotated nodes.
///
/// Float-list attributes compare their original values with tolerance;
/// other attributes exactly, ignoring annotation and insignificant names.
/// Subtrees only count through `_ChildrenHash` (set on atomic and nested nodes).
#[must_use]
pub fn equivalent(a: &Element, b: &Element) -> bool {
    if a.tag != b.tag {
        return false;
    }

    let floats = listed(a, FLOAT_LISTS);
    if floats != listed(b, FLOAT_LISTS) {
        return false;
    }
    for name in &floats {
        match (float_original(a, name), float_original(b, name)) {
            (Some(x), Some(y)) if floats_close(x, y) => {}
            _ => return false,
        }
    }

    let ignored: HashSet<&str> = listed(a, INSIGNIFICANT_KEYS)
        .into_iter()
        .chain(listed(b, INSIGNIFICANT_KEYS))
        .collect();
    let comparable = |e: &'_ Element| -> BTreeMap<String, String> {
        e.significant_attrs()
            .filter(|(k, _)| !floats.contains(k) && !ignored.contains(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };

    comparable(a) == comparable(b)
        && a.normalized_text() == b.normalized_text()
        && a.attr(CHILDREN_HASH) == b.attr(CHILDREN_HASH)
        && a.attr(DUPLICATE_COUNT) == b.attr(DUPLICATE_COUNT)
}
