//! Relationship graph compiler: noisy relationship records in, Mermaid text out.
//!
//! The passes run in a fixed order: filter invalid records, drop duplicate
//! ordered pairs, assign node ids, build edges and groups, resolve focus
//! highlights. Everything here is pure and synchronous; I/O lives in the
//! callers (`ingest`, `render`, `pipeline`).

mod compiler;
mod diagram;
mod edges;
mod filter;
mod groups;
mod highlight;
mod node_id;

pub use compiler::{compile, Compiler};
pub use diagram::{CompileStats, CompiledDiagram, Direction, Node};
pub use edges::{build_edges, dedup_pairs, truncate_label, Edge};
pub use filter::{filter_records, is_invalid_name, FilterStats, Filtered, INVALID_NAMES};
pub use groups::{build_groups, sanitize_group_name, Group};
pub use highlight::resolve_highlights;
pub use node_id::{assign_ids, hashed_bucket, AssignedIds, NodeId, NodeIdStrategy, ID_BUCKETS};

use serde::{Deserialize, Deserializer, Serialize};

/// Visual/semantic type of a relationship edge.
///
/// Deserialization is lenient: every accepted synonym maps onto one of the
/// three kinds and anything unrecognised becomes `Directed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum RelationKind {
    #[default]
    Directed,
    Bidirectional,
    Dotted,
}

impl RelationKind {
    /// Map a raw relation-type string onto a kind.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "bidirectional" | "both" | "mutual" | "双方向" | "相互" | "<-->" => Self::Bidirectional,
            "dotted" | "dashed" | "点線" | "-.->" => Self::Dotted,
            // "directed", "direct", "一方向", "有向", "-->" and anything unknown
            _ => Self::Directed,
        }
    }

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directed => "directed",
            Self::Bidirectional => "bidirectional",
            Self::Dotted => "dotted",
        }
    }

    /// Mermaid arrow token for this kind.
    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Directed => "-->",
            Self::Bidirectional => "<-->",
            Self::Dotted => "-.->",
        }
    }
}

impl From<String> for RelationKind {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for RelationKind {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<RelationKind> for &'static str {
    fn from(kind: RelationKind) -> Self {
        kind.as_str()
    }
}

/// One claimed relationship between two named entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "relation_type", alias = "kind", default)]
    pub kind: RelationKind,
    #[serde(default)]
    pub label: String,
    /// Cluster name; empty means ungrouped.
    #[serde(default)]
    pub group: String,
}

impl RelationshipRecord {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: RelationKind,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            label: label.into(),
            group: String::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }
}

/// Compiler input: ordered relationship records plus the entities to emphasize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    /// Accepts `focus` or `center_person`, each as a single string or a list.
    #[serde(default, alias = "center_person", deserialize_with = "one_or_many")]
    pub focus: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<RelationshipRecord>,
}

impl RelationshipGraph {
    pub fn new(relationships: Vec<RelationshipRecord>) -> Self {
        Self {
            focus: Vec::new(),
            relationships,
        }
    }

    pub fn with_focus<I, S>(mut self, focus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.focus.extend(focus.into_iter().map(Into::into));
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(name)) => vec![name],
        Some(OneOrMany::Many(names)) => names,
    };
    Ok(names.into_iter().filter(|n| !n.trim().is_empty()).collect())
}
