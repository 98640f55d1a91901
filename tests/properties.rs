//! Structural properties of compiled diagrams over generated inputs.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use relgraph::graph::{filter_records, RelationKind};
use relgraph::{compile, RelationshipGraph, RelationshipRecord};
use std::collections::HashSet;

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::sample::select(vec![
            "Alice", "Bob", "Carol", "Dave", "Lane", "Lane Shroud", "レイン", "カナデ", "タニア",
        ])
        .prop_map(str::to_string),
        1 => prop::sample::select(vec!["unknown", "?", "不明", "主体", "null", "", "   "])
            .prop_map(str::to_string),
        1 => "[A-Za-z ]{1,12}",
    ]
}

fn record_strategy() -> impl Strategy<Value = RelationshipRecord> {
    (
        name_strategy(),
        name_strategy(),
        prop::sample::select(vec!["directed", "bidirectional", "dotted", "双方向", "点線", "???"]),
        "\\PC{0,12}",
        prop::sample::select(vec!["", "PartyA", "勇者パーティー", "・・・", "team #1"]),
    )
        .prop_map(|(source, target, kind, label, group)| {
            RelationshipRecord::new(source, target, RelationKind::parse(kind), label).with_group(group)
        })
}

fn graph_strategy() -> impl Strategy<Value = RelationshipGraph> {
    (
        prop::collection::vec(record_strategy(), 0..24),
        prop::collection::vec(name_strategy(), 0..4),
    )
        .prop_map(|(records, focus)| RelationshipGraph::new(records).with_focus(focus))
}

fn check_one_edge_per_ordered_pair(graph: &RelationshipGraph) -> Result<(), TestCaseError> {
    let diagram = compile(graph);
    let mut seen = HashSet::new();
    for edge in &diagram.edges {
        prop_assert!(
            seen.insert((edge.source.clone(), edge.target.clone())),
            "duplicate edge {} -> {}",
            edge.source,
            edge.target
        );
    }
    Ok(())
}

fn check_labels_are_short(graph: &RelationshipGraph) -> Result<(), TestCaseError> {
    for edge in &compile(graph).edges {
        prop_assert!(edge.label.chars().count() <= 5, "label too long: {:?}", edge.label);
    }
    Ok(())
}

fn check_highlights_unique(graph: &RelationshipGraph) -> Result<(), TestCaseError> {
    let diagram = compile(graph);
    let unique: HashSet<_> = diagram.highlights.iter().collect();
    prop_assert_eq!(unique.len(), diagram.highlights.len());
    Ok(())
}

fn check_referential_integrity(graph: &RelationshipGraph) -> Result<(), TestCaseError> {
    let diagram = compile(graph);
    let ids: HashSet<_> = diagram.nodes.iter().map(|n| &n.id).collect();
    for edge in &diagram.edges {
        prop_assert!(ids.contains(&edge.source) && ids.contains(&edge.target));
    }
    for group in &diagram.groups {
        prop_assert!(!group.members.is_empty());
        for member in &group.members {
            prop_assert!(ids.contains(member), "group {} has unknown member {}", group.name, member);
        }
    }
    for id in &diagram.highlights {
        prop_assert!(ids.contains(id));
    }
    for node in &diagram.nodes {
        prop_assert!(!relgraph::graph::is_invalid_name(node.display_name.trim()));
    }
    Ok(())
}

fn check_deterministic(graph: &RelationshipGraph) -> Result<(), TestCaseError> {
    prop_assert_eq!(compile(graph).to_mermaid(), compile(&graph.clone()).to_mermaid());
    Ok(())
}

fn check_filter_idempotent(graph: &RelationshipGraph) -> Result<(), TestCaseError> {
    let once = filter_records(&graph.relationships);
    let twice = filter_records(&once.records);
    prop_assert_eq!(&twice.records, &once.records);
    prop_assert_eq!(twice.stats.invalid + twice.stats.empty, 0);
    Ok(())
}

proptest! {
    #[test]
    fn one_edge_per_ordered_pair(graph in graph_strategy()) {
        check_one_edge_per_ordered_pair(&graph)?;
    }

    #[test]
    fn labels_are_short(graph in graph_strategy()) {
        check_labels_are_short(&graph)?;
    }

    #[test]
    fn highlights_unique(graph in graph_strategy()) {
        check_highlights_unique(&graph)?;
    }

    #[test]
    fn referential_integrity(graph in graph_strategy()) {
        check_referential_integrity(&graph)?;
    }

    #[test]
    fn deterministic(graph in graph_strategy()) {
        check_deterministic(&graph)?;
    }

    #[test]
    fn filter_idempotent(graph in graph_strategy()) {
        check_filter_idempotent(&graph)?;
    }
}
