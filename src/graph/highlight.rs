//! Focus resolution: map loosely-named focus entities onto nodes.

use std::collections::{BTreeMap, HashSet};

use super::NodeId;

/// Resolve focus names to node ids, de-duplicated, in first-match order.
///
/// Exact display-name match first; otherwise the first node (display-name
/// order) whose name contains the focus or is contained in it. Blank focus
/// names and misses are skipped.
pub fn resolve_highlights(focus: &[String], ids: &BTreeMap<String, NodeId>) -> Vec<NodeId> {
    let mut resolved = Vec::new();
    let mut seen: HashSet<&NodeId> = HashSet::new();

    for raw in focus {
        let wanted = raw.trim();
        if wanted.is_empty() {
            continue;
        }

        let matched = ids.get(wanted).or_else(|| {
            ids.iter()
                .find(|(name, _)| name.contains(wanted) || wanted.contains(name.as_str()))
                .map(|(_, id)| id)
        });

        match matched {
            Some(id) => {
                if seen.insert(id) {
                    resolved.push(id.clone());
                }
            }
            None => log::debug!("Focus {:?} matched no node", wanted),
        }
    }

    resolved
}
