pub mod parsers;
pub mod walker;

pub use parsers::{strip_code_fences, ParserRegistry, RelationParser};
pub use walker::{discover_inputs, InputFile};

use std::path::Path;

use crate::error::{RelgraphError, Result};
use crate::graph::RelationshipGraph;

/// Read and parse one relationship file.
///
/// The parser is picked by extension; files without one are treated as JSON
/// (with the registry's CSV fallback).
pub fn load_graph(path: &Path, registry: &ParserRegistry) -> Result<RelationshipGraph> {
    let content = std::fs::read_to_string(path).map_err(RelgraphError::Io)?;

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "json".to_string());

    let graph = registry.parse(&content, &path.to_string_lossy(), &extension)?;
    log::debug!(
        "Loaded {} relationships from {}",
        graph.relationships.len(),
        path.display()
    );
    Ok(graph)
}
