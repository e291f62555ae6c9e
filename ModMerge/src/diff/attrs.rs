//! Names of the annotation attributes

/// Selector naming the node under its parent
pub const SELECTOR: &str = "_Selector";
/// Selector with float-list keys as written in the file; set only when it
/// differs from `_Selector`
pub const MERGE_SELECTOR: &str = "_MergeSelector";
/// Path from the root to the node's parent (empty for the root's children)
pub const PARENT_XPATH: &str = "_ParentXPath";
/// Classified [`NodeType`](crate::guide::NodeType)
pub const NODE_TYPE: &str = "_NodeType";
/// Comma-joined attribute names the selector is built from
pub const SELECTOR_KEYS: &str = "_SelectorKeys";
/// Number of siblings the selector of a non-unique node matches
pub const DUPLICATE_COUNT: &str = "_DuplicateCount";
/// Marks a sibling already counted by an earlier non-unique node
pub const DUPLICATE: &str = "_Duplicate";
/// Subtree fingerprint of atomic and nested nodes
pub const CHILDREN_HASH: &str = "_ChildrenHash";
/// Comma-joined names of rounded float-list attributes
pub const FLOAT_LISTS: &str = "_FloatLists";
/// Comma-joined attribute names left out of equivalence
pub const INSIGNIFICANT_KEYS: &str = "_InsignificantKeys";

/// Attribute holding the pre-rounding value of a float-list attribute.
#[must_use]
pub fn original(name: &str) -> String {
    format!("_{name}")
}

/// Split a comma-joined annotation into names.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
