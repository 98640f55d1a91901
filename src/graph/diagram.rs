//! Compiled diagram and its Mermaid serialization.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Edge, Group, NodeId};

/// Flowchart layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
    #[serde(rename = "TD", alias = "TB")]
    TopDown,
    #[serde(rename = "BT")]
    BottomTop,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
            Direction::TopDown => "TD",
            Direction::BottomTop => "BT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub display_name: String,
    pub id: NodeId,
}

/// Counters for what the compiler dropped or merged. Diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompileStats {
    /// Records with a placeholder endpoint.
    pub invalid: usize,
    /// Records with an empty endpoint.
    pub empty: usize,
    /// Records repeating an ordered pair.
    pub duplicate: usize,
    /// Names whose hash bucket was already taken.
    pub id_collisions: usize,
}

impl CompileStats {
    pub fn dropped(&self) -> usize {
        self.invalid + self.empty + self.duplicate
    }
}

/// Output of one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledDiagram {
    pub direction: Direction,
    /// Sorted by display name.
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub groups: Vec<Group>,
    pub highlights: Vec<NodeId>,
    pub highlight_style: String,
    pub stats: CompileStats,
}

impl CompiledDiagram {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_id(&self, display_name: &str) -> Option<&NodeId> {
        self.nodes
            .iter()
            .find(|n| n.display_name == display_name)
            .map(|n| &n.id)
    }

    pub fn is_highlighted(&self, display_name: &str) -> bool {
        self.node_id(display_name)
            .is_some_and(|id| self.highlights.contains(id))
    }

    /// Mermaid flowchart text. Byte-stable for equal input; no trailing blank lines.
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec![format!("graph {}", self.direction.as_str())];

        lines.extend(
            self.nodes
                .iter()
                .map(|node| format!("    {}[\"{}\"]", node.id, escape_name(&node.display_name))),
        );

        let mut group_lines = Vec::new();
        for group in &self.groups {
            group_lines.push(format!("    subgraph {}", group.name));
            group_lines.extend(group.members.iter().map(|id| format!("        {}", id)));
            group_lines.push("    end".to_string());
        }

        let edge_lines: Vec<String> = self
            .edges
            .iter()
            .map(|edge| {
                if edge.label.is_empty() {
                    format!("    {} {} {}", edge.source, edge.kind.arrow(), edge.target)
                } else {
                    format!(
                        "    {} {}|{}| {}",
                        edge.source,
                        edge.kind.arrow(),
                        escape_label(&edge.label),
                        edge.target
                    )
                }
            })
            .collect();

        let style_lines: Vec<String> = self
            .highlights
            .iter()
            .map(|id| format!("    style {} {}", id, self.highlight_style))
            .collect();

        for section in [group_lines, edge_lines, style_lines] {
            if section.is_empty() {
                continue;
            }
            lines.push(String::new());
            lines.extend(section);
        }

        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}

impl fmt::Display for CompiledDiagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_mermaid())
    }
}

fn flatten_newlines(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn escape_name(name: &str) -> String {
    flatten_newlines(name).replace('"', "#quot;")
}

fn escape_label(label: &str) -> String {
    flatten_newlines(label)
        .replace('"', "#quot;")
        .replace('|', "#124;")
}
