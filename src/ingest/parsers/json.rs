use super::{strip_code_fences, RelationParser};
use crate::error::{RelgraphError, Result};
use crate::graph::{RelationshipGraph, RelationshipRecord};
use serde::Deserialize;

/// JSON parser for structured (schema-constrained) LLM output
pub struct JsonRelationParser;

/// Accepted top-level shapes: the full graph object or a bare record list.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Graph(RelationshipGraph),
    Records(Vec<RelationshipRecord>),
}

impl RelationParser for JsonRelationParser {
    fn can_parse(&self, extension: &str) -> bool {
        extension == "json"
    }

    fn parse(&self, content: &str, path: &str) -> Result<RelationshipGraph> {
        let body = strip_code_fences(content);
        let input: JsonInput = serde_json::from_str(body)
            .map_err(|e| RelgraphError::Parse(format!("JSON parse error in {}: {}", path, e)))?;

        Ok(match input {
            JsonInput::Graph(graph) => graph,
            JsonInput::Records(records) => RelationshipGraph::new(records),
        })
    }
}
