//! Edge construction with at-most-one edge per ordered pair.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::{NodeId, RelationKind, RelationshipRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: RelationKind,
    /// Already truncated.
    pub label: String,
}

/// First `max_chars` characters of `label`, no ellipsis.
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    label.chars().take(max_chars).collect()
}

/// Drop every record whose ordered (source, target) pair was already seen.
///
/// The first record wins; later ones are not merged. Returns the survivors and
/// the number dropped. `A -> B` and `B -> A` are different pairs.
pub fn dedup_pairs(records: Vec<RelationshipRecord>) -> (Vec<RelationshipRecord>, usize) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut duplicates = 0;
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert((record.source.clone(), record.target.clone())) {
            unique.push(record);
        } else {
            duplicates += 1;
        }
    }

    (unique, duplicates)
}

/// Turn records into edges between assigned node ids.
///
/// Records whose endpoints have no id are skipped. An id pair is emitted at
/// most once even when two different name pairs share ids through a hash
/// collision.
pub fn build_edges(
    records: &[RelationshipRecord],
    ids: &BTreeMap<String, NodeId>,
    label_max_chars: usize,
) -> Vec<Edge> {
    let mut emitted: HashSet<(&NodeId, &NodeId)> = HashSet::new();
    let mut edges = Vec::with_capacity(records.len());

    for record in records {
        let (Some(source), Some(target)) = (ids.get(&record.source), ids.get(&record.target)) else {
            continue;
        };

        if !emitted.insert((source, target)) {
            log::debug!("Skipping edge {} -> {}: id pair already emitted", source, target);
            continue;
        }

        edges.push(Edge {
            source: source.clone(),
            target: target.clone(),
            kind: record.kind,
            label: truncate_label(&record.label, label_max_chars),
        });
    }

    edges
}
