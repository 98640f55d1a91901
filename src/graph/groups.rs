//! Subgraph clustering from the `group` field.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

use super::{NodeId, RelationshipRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Sanitized, safe to use as a subgraph token.
    pub name: String,
    /// In display-name order, no repeats.
    pub members: Vec<NodeId>,
}

/// Everything outside ASCII alphanumerics, `_`, whitespace, Hiragana, Katakana
/// letters and CJK ideographs. The Katakana middle dot (U+30FB) is punctuation.
fn disallowed_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[^0-9A-Za-z_\s\x{3041}-\x{309F}\x{30A1}-\x{30FA}\x{30FC}-\x{30FF}\x{4E00}-\x{9FFF}]")
            .expect("Invalid regex pattern")
    })
}

/// Names shaped like generated node ids, e.g. `id_6461` or `id_6461_1`.
fn node_id_like() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^id_\d+(?:_\d+)*$").expect("Invalid regex pattern"))
}

/// Mermaid flowchart keywords that end or restructure a subgraph block.
const RESERVED_NAMES: &[&str] = &[
    "end",
    "subgraph",
    "graph",
    "flowchart",
    "style",
    "classdef",
    "class",
    "click",
    "linkstyle",
    "direction",
];

fn is_unusable_name(name: &str) -> bool {
    RESERVED_NAMES.contains(&name.to_lowercase().as_str()) || node_id_like().is_match(name)
}

/// Strip characters the renderer rejects in subgraph names.
///
/// Whitespace runs collapse to one space. An empty result, a Mermaid keyword
/// or a name that could be mistaken for a node id becomes `fallback`.
pub fn sanitize_group_name(raw: &str, fallback: &str) -> String {
    let stripped = disallowed_chars().replace_all(raw, "");
    let name = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() || is_unusable_name(&name) {
        fallback.to_string()
    } else {
        name
    }
}

/// Collect group membership from records, keyed by sanitized name in
/// first-seen order. Groups with no assigned member are not returned.
pub fn build_groups(
    records: &[RelationshipRecord],
    ids: &BTreeMap<String, NodeId>,
    fallback: &str,
) -> Vec<Group> {
    let mut by_name: IndexMap<String, BTreeSet<&str>> = IndexMap::new();

    // whitespace-only groups are still groups and take the fallback name
    for record in records {
        if record.group.is_empty() {
            continue;
        }
        let members = by_name
            .entry(sanitize_group_name(&record.group, fallback))
            .or_default();
        members.insert(record.source.as_str());
        members.insert(record.target.as_str());
    }

    by_name
        .into_iter()
        .filter_map(|(name, member_names)| {
            let mut seen = HashSet::new();
            let members: Vec<NodeId> = member_names
                .into_iter()
                .filter_map(|member| ids.get(member))
                .filter(|id| seen.insert(*id))
                .cloned()
                .collect();
            if members.is_empty() {
                log::debug!("Skipping group {:?}: no member survived", name);
                None
            } else {
                Some(Group { name, members })
            }
        })
        .collect()
}
