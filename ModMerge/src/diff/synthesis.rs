//! Turning a diff into a merge command

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::command::{ALL_KEYS, ActionType, Command, CommandPreview};
use crate::error::{Error, Result};
use crate::formats::xml::{Element, Node};
use crate::guide::NodeType;

use super::annotate::{clean, merge_selector};
use super::attrs::{self, DUPLICATE_COUNT, FLOAT_LISTS, NODE_TYPE, PARENT_XPATH, SELECTOR_KEYS};
use super::hash::{cached_children_hash, floats_close};
use super::types::{ChangeType, Diff};

/// Build the command for a diff of annotated nodes.
///
/// # Errors
/// Returns [`Error::InvalidDiff`] for an unchanged or malformed diff, or
/// [`Error::IncorrectSelector`] if the primary node lacks a selector.
pub fn command_for(diff: &Diff) -> Result<Command> {
    let Some(primary) = diff.primary() else {
        return Err(Error::invalid_diff(format!("{:?} diff without its primary node", diff.change_type)));
    };
    let node_type = node_type_of(primary)?;
    // The base node, when there is one, is what the command has to find
    let target = diff.source.as_ref().unwrap_or(primary);
    let selector = merge_selector(target).ok_or_else(|| Error::IncorrectSelector {
        tag: target.tag.clone(),
        line: target.line,
    })?;

    let cleaned = clean(primary);
    let mut command = Command::new(ActionType::Add, primary.tag.clone());
    command.parent_path = primary.attr(PARENT_XPATH).unwrap_or_default().to_string();
    command.selector = selector.to_string();
    command.existing_count = diff.source.as_ref().map_or(1, |s| duplicate_count(s).unwrap_or(1));

    match (diff.change_type, &diff.source, &diff.result) {
        (ChangeType::Added, _, Some(_)) => {
            if node_type == NodeType::NonUnique {
                command.action = ActionType::AddOrReplace;
                command.desired_count = duplicate_count(primary)?;
            }
            fill_full(&mut command, cleaned);
        }
        (ChangeType::Removed, Some(_), _) => {
            command.action = ActionType::Remove;
            let keys = annotated_keys(primary);
            command.node_attrs = cleaned
                .attributes
                .into_iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .collect();
        }
        (ChangeType::Modified, Some(source), Some(result)) => {
            let before = clean(source);
            let removes_keys = before.attributes.keys().any(|k| !cleaned.has_attr(k));
            let has_children = source.has_element_children() || result.has_element_children();
            let equivalent_children = cached_children_hash(source) == cached_children_hash(result);
            let text_changed = source.normalized_text() != result.normalized_text();

            if node_type == NodeType::Atomic
                || removes_keys
                || (has_children && !equivalent_children)
                || text_changed
                || node_type == NodeType::NonUnique
            {
                command.action = ActionType::AddOrReplace;
                if node_type == NodeType::NonUnique {
                    command.desired_count = duplicate_count(primary)?;
                }
                fill_full(&mut command, cleaned);
            } else {
                command.action = ActionType::Modify;
                command.node_attrs = changed_attrs(&before, &cleaned, primary);
            }
        }
        (change_type, _, _) => {
            return Err(Error::invalid_diff(format!("cannot build a command for a {change_type:?} diff")));
        }
    }

    command.selector_keys = final_selector_keys(primary, &command.node_attrs);
    if !command.selector_keys.is_empty() {
        let rebuilt = command.effective_selector();
        // A float-list key may differ from the base within tolerance;
        // then only the literal base selector finds the node
        if diff.source.is_some() && rebuilt != command.selector {
            command.selector_keys.clear();
        } else {
            command.selector = rebuilt;
        }
    }
    command.preview = Some(CommandPreview {
        source: diff.source.as_ref().map(clean),
        result: diff.result.as_ref().map(clean),
    });
    Ok(command)
}

/// Read the `_NodeType` annotation.
pub(crate) fn node_type_of(element: &Element) -> Result<NodeType> {
    element
        .attr(NODE_TYPE)
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| Error::invalid_diff(format!("<{}> (line {}) is not annotated", element.tag, element.line)))
}

fn duplicate_count(element: &Element) -> Result<usize> {
    element
        .attr(DUPLICATE_COUNT)
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| {
            Error::invalid_diff(format!(
                "non-unique <{}> (line {}) has no valid {DUPLICATE_COUNT}",
                element.tag, element.line
            ))
        })
}

fn annotated_keys(element: &Element) -> Vec<&str> {
    element
        .attr(SELECTOR_KEYS)
        .map(|v| attrs::split_list(v).collect())
        .unwrap_or_default()
}

fn fill_full(command: &mut Command, cleaned: Element) {
    command.node_attrs = cleaned.attributes;
    command.text = cleaned.text.filter(|t| !t.trim().is_empty());
    command.children_nodes = cleaned.children.into_iter().filter_map(Node::into_element).collect();
}

/// Attributes whose value changed, plus the selector keys, in result order.
fn changed_attrs(before: &Element, after: &Element, annotated: &Element) -> IndexMap<String, String> {
    let keys = annotated_keys(annotated);
    let floats: HashSet<&str> = annotated
        .attr(FLOAT_LISTS)
        .map(|v| attrs::split_list(v).collect())
        .unwrap_or_default();

    after
        .attributes
        .iter()
        .filter(|(k, v)| {
            if keys.contains(&k.as_str()) {
                return true;
            }
            match before.attr(k) {
                None => true,
                Some(old) if floats.contains(k.as_str()) => !floats_close(old, v),
                Some(old) => old != v.as_str(),
            }
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// `_SelectorKeys` if all of them ended up in the command's attributes;
/// the `*` sentinel when they are exactly those attributes and more than one.
fn final_selector_keys(primary: &Element, node_attrs: &IndexMap<String, String>) -> Vec<String> {
    let keys = annotated_keys(primary);
    if keys.is_empty() || !keys.iter().all(|k| node_attrs.contains_key(*k)) {
        return Vec::new();
    }
    let key_set: HashSet<&str> = keys.iter().copied().collect();
    if key_set.len() > 1 && key_set.len() == node_attrs.len() && node_attrs.keys().all(|k| key_set.contains(k.as_str())) {
        return vec![ALL_KEYS.to_string()];
    }
    keys.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::diff::attrs::SELECTOR;

    fn annotated(tag: &str, node_type: NodeType, selector: &str, keys: &str) -> Element {
        Element::new(tag)
            .with_attr(NODE_TYPE, node_type.as_str())
            .with_attr(SELECTOR, selector)
            .with_attr(SELECTOR_KEYS, keys)
            .with_attr(PARENT_XPATH, "")
    }

    #[test]
    fn test_added_unique() {
        let r = annotated("A", NodeType::UniqueKeys, "A[@x='2']", "x").with_attr("x", "2");
        let command = command_for(&Diff::new(None, Some(r)).unwrap()).unwrap();
        assert_eq!(command.action, ActionType::Add);
        assert_eq!(command.selector, "A[@x='2']");
        assert_eq!(command.selector_keys, vec!["x".to_string()]);
        assert_eq!(command.node_attrs.len(), 1);
    }

    #[test]
    fn test_added_non_unique_needs_count() {
        let r = annotated("P", NodeType::NonUnique, "P[@k='1']", "k").with_attr("k", "1");
        let missing = command_for(&Diff::new(None, Some(r.clone())).unwrap());
        assert!(matches!(missing, Err(Error::InvalidDiff { .. })));

        let r = r.with_attr(DUPLICATE_COUNT, "2");
        let command = command_for(&Diff::new(None, Some(r)).unwrap()).unwrap();
        assert_eq!(command.action, ActionType::AddOrReplace);
        assert_eq!(command.desired_count, 2);
    }

    #[test]
    fn test_removed_keeps_only_keys() {
        let l = annotated("A", NodeType::UniqueKeys, "A[@x='1']", "x")
            .with_attr("x", "1")
            .with_attr("y", "2");
        let command = command_for(&Diff::new(Some(l), None).unwrap()).unwrap();
        assert_eq!(command.action, ActionType::Remove);
        assert_eq!(command.node_attrs.keys().collect::<Vec<_>>(), vec!["x"]);
        assert!(command.children_nodes.is_empty());
    }

    #[test]
    fn test_modified_attribute_only() {
        let l = annotated("A", NodeType::UniqueKeys, "A[@x='1']", "x")
            .with_attr("x", "1")
            .with_attr("y", "2")
            .with_attr("z", "0");
        let r = annotated("A", NodeType::UniqueKeys, "A[@x='1']", "x")
            .with_attr("x", "1")
            .with_attr("y", "3")
            .with_attr("z", "0");
        let command = command_for(&Diff::new(Some(l), Some(r)).unwrap()).unwrap();
        assert_eq!(command.action, ActionType::Modify);
        let attrs: Vec<(&str, &str)> = command.node_attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(attrs, vec![("x", "1"), ("y", "3")]);
        assert!(command.preview.is_some());
    }

    #[test]
    fn test_modified_removing_key_replaces() {
        let l = annotated("A", NodeType::UniqueKeys, "A[@x='1']", "x")
            .with_attr("x", "1")
            .with_attr("gone", "2");
        let r = annotated("A", NodeType::UniqueKeys, "A[@x='1']", "x").with_attr("x", "1");
        let command = command_for(&Diff::new(Some(l), Some(r)).unwrap()).unwrap();
        assert_eq!(command.action, ActionType::AddOrReplace);
        assert_eq!(command.desired_count, 1);
    }

    #[test]
    fn test_all_keys_sentinel() {
        let r = annotated("P", NodeType::NonUnique, "P[@k='1'][@m='2']", "k,m")
            .with_attr("k", "1")
            .with_attr("m", "2")
            .with_attr(DUPLICATE_COUNT, "1");
        let command = command_for(&Diff::new(None, Some(r)).unwrap()).unwrap();
        assert_eq!(command.selector_keys, vec!["*".to_string()]);
        assert_eq!(command.selector, "P[@k='1'][@m='2']");
    }

    #[test]
    fn test_unique_tag_uses_literal_selector() {
        let l = annotated("O", NodeType::UniqueTag, "O", "").with_attr("v", "1");
        let command = command_for(&Diff::new(Some(l), None).unwrap()).unwrap();
        assert!(command.selector_keys.is_empty());
        assert_eq!(command.selector, "O");
        assert!(command.node_attrs.is_empty());
    }

    #[test]
    fn test_jittered_float_key_selects_base_value() {
        let node = |original: &str, name: &str| {
            annotated("G", NodeType::UniqueKeys, "G[@Pos='1.2 2.0 3.0']", "Pos")
                .with_attr("Pos", "1.2 2.0 3.0")
                .with_attr("_Pos", original)
                .with_attr(FLOAT_LISTS, "Pos")
                .with_attr(attrs::MERGE_SELECTOR, format!("G[@Pos='{original}']"))
                .with_attr("Name", name)
        };
        let diff = Diff::new(Some(node("1.23 2 3", "a")), Some(node("1.24 2 3", "b"))).unwrap();
        let command = command_for(&diff).unwrap();
        assert_eq!(command.action, ActionType::Modify);
        assert!(command.selector_keys.is_empty());
        assert_eq!(command.selector, "G[@Pos='1.23 2 3']");
        assert_eq!(command.node_attrs.get("Pos").map(String::as_str), Some("1.24 2 3"));
    }

    #[test]
    fn test_float_list_within_tolerance_not_reported() {
        let base = |pos: &str, original: &str| {
            annotated("O", NodeType::UniqueKeys, "O[@id='1']", "id")
                .with_attr("id", "1")
                .with_attr("Pos", pos)
                .with_attr("_Pos", original)
                .with_attr(FLOAT_LISTS, "Pos")
        };
        let l = base("1.0 2.0 3.0", "1.00 2.00 3.00").with_attr("Name", "a");
        let r = base("1.0 2.0 3.0", "1.01 2.00 3.00").with_attr("Name", "b");
        let command = command_for(&Diff::new(Some(l), Some(r)).unwrap()).unwrap();
        assert_eq!(command.action, ActionType::Modify);
        assert_eq!(command.node_attrs.keys().collect::<Vec<_>>(), vec!["id", "Name"]);
    }
}
