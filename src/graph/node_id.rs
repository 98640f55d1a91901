//! Diagram-safe node identifiers derived from display names.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Number of hash buckets node ids are reduced into.
pub const ID_BUCKETS: u64 = 10_000;

/// A node identifier such as `id_6461`. Contains only `[a-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub(crate) String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How names that land in the same hash bucket are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeIdStrategy {
    /// Colliding names share one id; the renderer keeps the last declaration.
    #[default]
    Hashed,
    /// Later colliding names get `id_{n}_{k}` suffixes.
    Probed,
}

/// Bucket for a display name: first 8 bytes of its SHA-256, big endian, mod [`ID_BUCKETS`].
pub fn hashed_bucket(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % ID_BUCKETS
}

#[derive(Debug, Clone, Default)]
pub struct AssignedIds {
    /// Display name → id, iterated in display-name order.
    pub ids: BTreeMap<String, NodeId>,
    /// Names whose bucket was already taken by an earlier name.
    pub collisions: usize,
}

/// Assign every name exactly one id. Names are visited in lexicographic order,
/// so the result does not depend on how the caller built the set.
pub fn assign_ids(names: &BTreeSet<String>, strategy: NodeIdStrategy) -> AssignedIds {
    let mut assigned = AssignedIds::default();
    let mut owners: HashMap<NodeId, &str> = HashMap::new();

    for name in names {
        let base = NodeId(format!("id_{}", hashed_bucket(name)));

        let id = match owners.get(&base) {
            None => base,
            Some(owner) => {
                assigned.collisions += 1;
                match strategy {
                    NodeIdStrategy::Hashed => {
                        log::warn!("Node id {} shared by {:?} and {:?}", base, owner, name);
                        base
                    }
                    NodeIdStrategy::Probed => {
                        let mut k = 1;
                        loop {
                            let candidate = NodeId(format!("{}_{}", base, k));
                            if !owners.contains_key(&candidate) {
                                log::debug!("Node id {} taken by {:?}, using {} for {:?}", base, owner, candidate, name);
                                break candidate;
                            }
                            k += 1;
                        }
                    }
                }
            }
        };

        owners.entry(id.clone()).or_insert(name.as_str());
        assigned.ids.insert(name.clone(), id);
    }

    assigned
}
