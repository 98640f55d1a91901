use std::collections::BTreeSet;

use crate::config::CompilerConfig;

use super::{
    assign_ids, build_edges, build_groups, dedup_pairs, filter_records, resolve_highlights,
    AssignedIds, CompileStats, CompiledDiagram, Filtered, Node, RelationshipGraph,
};

/// Relationship graph compiler.
///
/// Holds only options; `compile` keeps all working state local, so one
/// compiler can be shared across threads and called repeatedly.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerConfig,
}

impl Compiler {
    pub fn new(options: CompilerConfig) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerConfig {
        &self.options
    }

    /// Compile a relationship graph into a diagram. Never fails: bad records
    /// are dropped and counted in [`CompileStats`].
    pub fn compile(&self, graph: &RelationshipGraph) -> CompiledDiagram {
        let Filtered { records, stats: filter_stats } = filter_records(&graph.relationships);
        let (records, duplicate) = dedup_pairs(records);

        let names: BTreeSet<String> = records
            .iter()
            .flat_map(|r| [r.source.clone(), r.target.clone()])
            .collect();
        let AssignedIds { ids, collisions } = assign_ids(&names, self.options.node_id_strategy);

        let edges = build_edges(&records, &ids, self.options.label_max_chars);
        let groups = build_groups(&records, &ids, &self.options.group_fallback);
        let highlights = resolve_highlights(&graph.focus, &ids);

        let nodes: Vec<Node> = ids
            .into_iter()
            .map(|(display_name, id)| Node { display_name, id })
            .collect();

        let stats = CompileStats {
            invalid: filter_stats.invalid,
            empty: filter_stats.empty,
            duplicate,
            id_collisions: collisions,
        };

        log::debug!(
            "Compiled {} records into {} nodes, {} edges, {} groups, {} highlights (dropped: invalid={}, empty={}, duplicate={})",
            graph.relationships.len(),
            nodes.len(),
            edges.len(),
            groups.len(),
            highlights.len(),
            stats.invalid,
            stats.empty,
            stats.duplicate,
        );

        CompiledDiagram {
            direction: self.options.direction,
            nodes,
            edges,
            groups,
            highlights,
            highlight_style: self.options.highlight_style.clone(),
            stats,
        }
    }
}

/// Compile with default options.
pub fn compile(graph: &RelationshipGraph) -> CompiledDiagram {
    Compiler::default().compile(graph)
}
