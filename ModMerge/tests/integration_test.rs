use std::collections::BTreeMap;
use std::fmt::Write as _;

use modmerge::command::{decode, encode};
use modmerge::prelude::*;
use modmerge::xpath::Selector;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn parse(xml: &str) -> Element {
    parse_xml_str(xml).unwrap().root
}

fn guide() -> DiffGuide {
    DiffGuide::new("R")
        .with_unique(NodeSignature::for_tag("L").with_unique_keys(&["id"]))
        .with_unique(NodeSignature::for_tag("A").with_unique_keys(&["x"]))
        .with_unique(
            NodeSignature::for_tag("T")
                .with_unique_keys(&["n"])
                .with_children_tags(&["event"]),
        )
        .with_unique(NodeSignature::for_tag("O"))
        .with_unique(NodeSignature::for_tag("G").with_unique_keys(&["Pos"]))
        .with_unique(
            NodeSignature::for_tag("Link").with_children(vec![NodeSignature::for_tag("End").with_unique_keys(&["id"])]),
        )
        .with_non_unique(NodeSignature::for_tag("P").with_significant_keys(&["k"]))
        .with_float_lists(&["Pos"])
}

fn diff(base: &str, modded: &str) -> Vec<Command> {
    let differ = Differ::new(&guide()).unwrap();
    differ.diff_documents(&parse(base), &parse(modded)).unwrap().commands
}

/// Diff, apply onto the base, and return the merged tree.
fn roundtrip(base: &Element, modded: &Element) -> Element {
    let differ = Differ::new(&guide()).unwrap();
    let commands = differ.diff_documents(base, modded).unwrap().commands;
    let mut merged = base.clone();
    let report = Merger::default().apply(&mut merged, &commands).unwrap();
    assert!(report.is_clean(), "{report}");
    merged
}

/// Equivalent under the guide: re-diffing yields nothing.
fn assert_equivalent(left: &Element, right: &Element) {
    let differ = Differ::new(&guide()).unwrap();
    let summary = differ.diff_documents(left, right).unwrap();
    let leftover: Vec<String> = summary.commands.iter().map(ToString::to_string).collect();
    assert!(leftover.is_empty(), "trees differ: {leftover:?}");
}

fn attrs(command: &Command) -> Vec<(&str, &str)> {
    command
        .node_attrs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

// ==================== Scenarios ====================

#[test]
fn test_pure_addition() {
    let commands = diff(r#"<R><A x="1"/></R>"#, r#"<R><A x="1"/><A x="2"/></R>"#);
    assert_eq!(commands.len(), 1);
    let command = &commands[0];
    assert_eq!(command.action, ActionType::Add);
    assert_eq!(command.tag, "A");
    assert_eq!(command.selector, "A[@x='2']");
    assert_eq!(attrs(command), vec![("x", "2")]);
}

#[test]
fn test_modify_single_attribute() {
    let commands = diff(r#"<R><A x="1" y="2"/></R>"#, r#"<R><A x="1" y="3"/></R>"#);
    assert_eq!(commands.len(), 1);
    let command = &commands[0];
    assert_eq!(command.action, ActionType::Modify);
    assert_eq!(command.selector, "A[@x='1']");
    assert_eq!(attrs(command), vec![("x", "1"), ("y", "3")]);
    assert!(command.children_nodes.is_empty());
}

#[test]
fn test_atomic_subtree_replace() {
    let commands = diff(
        r#"<R><T n="k"><event>a</event></T></R>"#,
        r#"<R><T n="k"><event>b</event></T></R>"#,
    );
    assert_eq!(commands.len(), 1);
    let command = &commands[0];
    assert_eq!(command.action, ActionType::AddOrReplace);
    assert_eq!(command.selector, "T[@n='k']");
    assert_eq!(command.children_nodes, vec![Element::new("event").with_text("b")]);
}

#[test]
fn test_non_unique_removal() {
    let commands = diff(
        r#"<R><P k="1"/><P k="1"/><P k="1"/></R>"#,
        r#"<R><P k="1"/></R>"#,
    );
    assert_eq!(commands.len(), 1);
    let command = &commands[0];
    assert_eq!(command.action, ActionType::AddOrReplace);
    assert_eq!(command.selector, "P[@k='1']");
    assert_eq!(command.desired_count, 1);
    assert_eq!(attrs(command), vec![("k", "1")]);
}

#[test]
fn test_float_list_tolerance() {
    let commands = diff(
        r#"<R><O Pos="1.00 2.00 3.00"/></R>"#,
        r#"<R><O Pos="1.02 1.98 3.01"/></R>"#,
    );
    assert!(commands.is_empty());
}

#[test]
fn test_ambiguous_parent() {
    let xml = "<R><A><B/></A><A><B/></A></R>";
    let mut base = parse(xml);
    let mut command = Command::new(ActionType::Add, "C");
    command.parent_path = "A".into();

    let report = Merger::default().apply(&mut base, std::slice::from_ref(&command)).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::AmbiguousMergeCommand);
    assert_eq!(base, parse(xml));

    let strict = Merger::new(MergeOptions::stop_on_first()).apply(&mut base, &[command]);
    let error = strict.unwrap_err();
    assert_eq!(error.failure_kind(), Some(FailureKind::AmbiguousMergeCommand));
    assert_eq!(base, parse(xml));
}

// ==================== Round-trips ====================

#[test]
fn test_float_keyed_parent_addresses_file_values() {
    let base = parse(r#"<R><G Pos="1.23 2 3"><A x="1" y="a"/></G></R>"#);

    // Nested change under a parent keyed by a float list
    let modded = parse(r#"<R><G Pos="1.23 2 3"><A x="1" y="b"/></G></R>"#);
    let commands = Differ::new(&guide()).unwrap().diff_documents(&base, &modded).unwrap().commands;
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].parent_path, "G[@Pos='1.23 2 3']");
    assert_eq!(roundtrip(&base, &modded), modded);

    // Additions must land under that parent, not under the root
    let modded = parse(r#"<R><G Pos="1.23 2 3"><A x="1" y="a"/><A x="2" y="c"/></G></R>"#);
    let merged = roundtrip(&base, &modded);
    assert_eq!(merged, modded);
    assert_eq!(merged.element_count(), 1);
}

#[test]
fn test_jittered_parent_uses_base_values() {
    let base = parse(r#"<R><G Pos="1.23 2 3" v="1"><A x="1"/></G></R>"#);
    let modded = parse(r#"<R><G Pos="1.24 2 3" v="1"><A x="1"/><A x="2"/></G></R>"#);

    let commands = Differ::new(&guide()).unwrap().diff_documents(&base, &modded).unwrap().commands;
    let rendered: Vec<String> = commands.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["Add G[@Pos='1.23 2 3']/A[@x='2']"]);
    assert_equivalent(&roundtrip(&base, &modded), &modded);

    // Modifying the jittered node itself still finds it by its base value
    let modded = parse(r#"<R><G Pos="1.24 2 3" v="2"><A x="1"/></G></R>"#);
    let commands = Differ::new(&guide()).unwrap().diff_documents(&base, &modded).unwrap().commands;
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].action, ActionType::Modify);
    assert_eq!(commands[0].effective_selector(), "G[@Pos='1.23 2 3']");
    let merged = roundtrip(&base, &modded);
    assert_eq!(merged, modded);
}

#[test]
fn test_nested_and_atomic_under_keyed_parent_through_xml() {
    let base = parse(
        r#"<R><L id="1">
            <T n="t"><event>a</event></T>
            <Link w="0"><End id="a"/><End id="b"/></Link>
            <G Pos="0.48 1 2"><A x="1"/></G>
        </L></R>"#,
    );
    let modded = parse(
        r#"<R><L id="1">
            <T n="t"><event>b</event></T>
            <Link w="1"><End id="a"/><End id="b"/></Link>
            <G Pos="0.51 1 2"><A x="1" y="2"/></G>
        </L></R>"#,
    );

    let differ = Differ::new(&guide()).unwrap();
    let summary = differ.diff_documents(&base, &modded).unwrap();
    let rendered: Vec<String> = summary.commands.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "AddOrReplace L[@id='1']/T[@n='t']",
            "Modify L[@id='1']/Link[End[1][@id='a'] and End[2][@id='b']]",
            "Modify L[@id='1']/G[@Pos='0.48 1 2']/A[@x='1']",
        ]
    );

    let text = to_xml_string(&differ.serialise(&summary.commands, &summary.root_tag)).unwrap();
    let mut merged = base.clone();
    let report = Merger::default().apply_document(&mut merged, &parse(&text)).unwrap();
    assert!(report.is_clean(), "{report}");
    assert_equivalent(&merged, &modded);
}

#[test]
fn test_mixed_document_roundtrip() {
    let base = parse(
        r#"<R>
            <!-- vanilla -->
            <L id="1"><A x="1" y="1"/><A x="2"/></L>
            <P k="1"/><P k="1"/>
            <T n="k"><event>a</event></T>
            <O Pos="1.00 2.00 3.00" v="1"/>
        </R>"#,
    );
    let modded = parse(
        r#"<R>
            <L id="1"><A x="1" y="5"/><A x="3"/></L>
            <L id="2"><A x="9"/></L>
            <P k="1"/><P k="1"/><P k="1"/><P k="2"/>
            <T n="k"><event>b</event></T>
            <O Pos="1.01 2.00 3.00" v="2"/>
        </R>"#,
    );

    let commands = Differ::new(&guide()).unwrap().diff_documents(&base, &modded).unwrap().commands;
    let rendered: Vec<String> = commands.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "Modify L[@id='1']/A[@x='1']",
            "Add L[@id='1']/A[@x='3']",
            "Remove L[@id='1']/A[@x='2']",
            "Add L[@id='2']",
            "AddOrReplace P[@k='1'] x3",
            "AddOrReplace P[@k='2']",
            "AddOrReplace T[@n='k']",
            "Modify O",
        ]
    );

    let merged = roundtrip(&base, &modded);
    assert_equivalent(&merged, &modded);
}

#[test]
fn test_command_document_through_xml() {
    let base = parse(r#"<R><A x="1" y="it's"/><P k="1"/></R>"#);
    let modded = parse(r#"<R><A x="1" y="say &quot;hi&quot;"/><A x="2"/><P k="1"/><P k="1"/></R>"#);

    let differ = Differ::new(&guide()).unwrap();
    let summary = differ.diff_documents(&base, &modded).unwrap();
    let document = differ.serialise(&summary.commands, &summary.root_tag);
    let text = to_xml_string(&document).unwrap();

    let mut merged = base.clone();
    let report = Merger::default().apply_document(&mut merged, &parse(&text)).unwrap();
    assert!(report.is_clean(), "{report}");
    assert_equivalent(&merged, &modded);
}

#[test]
fn test_files_keep_legacy_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let base_path = dir.path().join("base.xml");
    let modded_path = dir.path().join("modded.xml");
    let commands_path = dir.path().join("commands.xml");

    let legacy = |body: &str| {
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(body);
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?>".to_vec();
        bytes.extend_from_slice(&encoded);
        bytes
    };
    std::fs::write(&base_path, legacy(r#"<R><A x="1" name="Меч"/></R>"#)).unwrap();
    std::fs::write(&modded_path, legacy(r#"<R><A x="1" name="Топор"/></R>"#)).unwrap();

    let base = read_xml(&base_path).unwrap();
    let modded = read_xml(&modded_path).unwrap();
    let summary = Differ::new(&guide()).unwrap().diff_documents(&base.root, &modded.root).unwrap();
    CommandDocument::new(summary.root_tag, summary.commands)
        .write(&commands_path, &base.write_options())
        .unwrap();

    let (merged, report) = Merger::default().apply_files(&base_path, &commands_path).unwrap();
    assert!(report.is_clean());
    assert_eq!(merged.encoding, encoding_rs::WINDOWS_1251);
    assert_eq!(merged.root.child_element(0).unwrap().attr("name"), Some("Топор"));
}

// ==================== Properties ====================

fn write_leaves(xml: &mut String, leaves: &BTreeMap<u8, Option<u8>>) {
    for (x, y) in leaves {
        match y {
            Some(y) => write!(xml, r#"<A x="{x}" y="{y}"/>"#).unwrap(),
            None => write!(xml, r#"<A x="{x}"/>"#).unwrap(),
        }
    }
}

fn tree_xml(a: &BTreeMap<u8, Option<u8>>, p: &[usize]) -> String {
    let mut xml = String::from("<R>");
    write_leaves(&mut xml, a);
    for (k, count) in p.iter().enumerate() {
        for _ in 0..*count {
            write!(xml, r#"<P k="{k}"/>"#).unwrap();
        }
    }
    xml.push_str("<!-- end --></R>");
    xml
}

fn tree_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::btree_map(0u8..6, prop::option::of(0u8..3), 0..5),
        prop::collection::vec(0usize..3, 3),
    )
        .prop_map(|(a, p)| tree_xml(&a, &p))
}

#[derive(Debug, Clone)]
struct Group {
    jitter: i32,
    v: Option<u8>,
    leaves: BTreeMap<u8, Option<u8>>,
}

#[derive(Debug, Clone)]
struct Level {
    leaves: BTreeMap<u8, Option<u8>>,
    event: Option<u8>,
    link: Option<(u8, u8)>,
    groups: BTreeMap<u8, Group>,
}

/// Levels hold leaves, an atomic trigger, a nested link and groups keyed by
/// a jittered float list; the jitter stays within tolerance.
fn nested_xml(levels: &BTreeMap<u8, Level>, p: &[usize]) -> String {
    let mut xml = String::from("<R>");
    for (id, level) in levels {
        write!(xml, r#"<L id="{id}">"#).unwrap();
        write_leaves(&mut xml, &level.leaves);
        if let Some(event) = level.event {
            write!(xml, r#"<T n="t"><event>{event}</event></T>"#).unwrap();
        }
        if let Some((w, end)) = level.link {
            write!(xml, r#"<Link w="{w}"><End id="a"/><End id="e{end}"/></Link>"#).unwrap();
        }
        for (g, group) in &level.groups {
            write!(xml, r#"<G Pos="{g}.{} 1 2""#, 50 + group.jitter).unwrap();
            if let Some(v) = group.v {
                write!(xml, r#" v="{v}""#).unwrap();
            }
            xml.push('>');
            write_leaves(&mut xml, &group.leaves);
            xml.push_str("</G>");
        }
        xml.push_str("</L>");
    }
    for (k, count) in p.iter().enumerate() {
        for _ in 0..*count {
            write!(xml, r#"<P k="{k}"/>"#).unwrap();
        }
    }
    xml.push_str("</R>");
    xml
}

fn leaves_strategy() -> impl Strategy<Value = BTreeMap<u8, Option<u8>>> {
    prop::collection::btree_map(0u8..4, prop::option::of(0u8..3), 0..3)
}

fn nested_tree_strategy() -> impl Strategy<Value = String> {
    let group = (-2i32..=2, prop::option::of(0u8..2), leaves_strategy())
        .prop_map(|(jitter, v, leaves)| Group { jitter, v, leaves });
    let level = (
        leaves_strategy(),
        prop::option::of(0u8..2),
        prop::option::of((0u8..2, 0u8..2)),
        prop::collection::btree_map(0u8..3, group, 0..3),
    )
        .prop_map(|(leaves, event, link, groups)| Level { leaves, event, link, groups });
    (
        prop::collection::btree_map(0u8..3, level, 0..3),
        prop::collection::vec(0usize..3, 2),
    )
        .prop_map(|(levels, p)| nested_xml(&levels, &p))
}

proptest! {
    #[test]
    fn test_equal_trees_produce_no_commands(xml in tree_strategy()) {
        let tree = parse(&xml);
        let summary = Differ::new(&guide()).unwrap().diff_documents(&tree, &tree.clone()).unwrap();
        prop_assert!(summary.is_empty());
    }

    #[test]
    fn test_apply_diff_reaches_modded(base in tree_strategy(), modded in tree_strategy()) {
        let base = parse(&base);
        let modded = parse(&modded);
        let merged = roundtrip(&base, &modded);
        assert_equivalent(&merged, &modded);
    }

    #[test]
    fn test_apply_diff_reaches_modded_nested(base in nested_tree_strategy(), modded in nested_tree_strategy()) {
        let base = parse(&base);
        let modded = parse(&modded);
        let merged = roundtrip(&base, &modded);
        assert_equivalent(&merged, &modded);
    }

    #[test]
    fn test_command_document_reaches_modded_nested(base in nested_tree_strategy(), modded in nested_tree_strategy()) {
        let base = parse(&base);
        let modded = parse(&modded);
        let differ = Differ::new(&guide()).unwrap();
        let summary = differ.diff_documents(&base, &modded).unwrap();
        let text = to_xml_string(&differ.serialise(&summary.commands, &summary.root_tag)).unwrap();

        let mut merged = base.clone();
        let report = Merger::default().apply_document(&mut merged, &parse(&text)).unwrap();
        prop_assert!(report.is_clean(), "{}", report);
        assert_equivalent(&merged, &modded);
    }

    #[test]
    fn test_equal_nested_trees_produce_no_commands(xml in nested_tree_strategy()) {
        let tree = parse(&xml);
        let summary = Differ::new(&guide()).unwrap().diff_documents(&tree, &tree.clone()).unwrap();
        prop_assert!(summary.is_empty());
    }

    #[test]
    fn test_command_codec_roundtrip(base in nested_tree_strategy(), modded in nested_tree_strategy()) {
        let commands = diff(&base, &modded);
        for command in &commands {
            prop_assert_eq!(&decode(&encode(command)).unwrap(), command);
        }
    }

    #[test]
    fn test_annotation_is_idempotent(xml in nested_tree_strategy()) {
        let differ = Differ::new(&guide()).unwrap();
        let mut once = parse(&xml);
        differ.annotate(&mut once).unwrap();

        let mut twice = once.clone();
        differ.annotate(&mut twice).unwrap();
        prop_assert_eq!(&twice, &once);

        let mut again = modmerge::diff::clean(&once);
        differ.annotate(&mut again).unwrap();
        prop_assert_eq!(&again, &once);
    }

    #[test]
    fn test_float_jitter_is_ignored(
        base in prop::collection::vec(-50_000i32..50_000, 3),
        jitter in prop::collection::vec(-4i32..=4, 3),
    ) {
        let pos = |values: &[i32]| {
            values
                .iter()
                .map(|v| format!("{:.2}", f64::from(*v) / 100.0))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let moved: Vec<i32> = base.iter().zip(&jitter).map(|(b, j)| b + j).collect();
        let commands = diff(
            &format!(r#"<R><O Pos="{}" v="1"/></R>"#, pos(&base)),
            &format!(r#"<R><O Pos="{}" v="1"/></R>"#, pos(&moved)),
        );
        prop_assert!(commands.is_empty());
    }

    #[test]
    fn test_non_unique_multiplicity(j in 0usize..5, k in 0usize..5) {
        let copies = |n: usize| format!("<R><A x=\"0\"/>{}</R>", r#"<P k="1"/>"#.repeat(n));
        let base = parse(&copies(j));
        let modded = parse(&copies(k));
        let merged = roundtrip(&base, &modded);
        prop_assert_eq!(Selector::parse("P[@k='1']").unwrap().count(&merged.children), k);
    }
}
