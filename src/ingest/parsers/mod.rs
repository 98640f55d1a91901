pub mod csv;
pub mod json;

use crate::error::{RelgraphError, Result};
use crate::graph::RelationshipGraph;

/// Trait for relationship input parsers
pub trait RelationParser: Send + Sync {
    /// Check if this parser can handle the given file extension
    fn can_parse(&self, extension: &str) -> bool;

    /// Parse document content into a relationship graph
    fn parse(&self, content: &str, path: &str) -> Result<RelationshipGraph>;
}

/// Parser registry that selects appropriate parser by extension
pub struct ParserRegistry {
    parsers: Vec<Box<dyn RelationParser>>,
}

impl ParserRegistry {
    /// Create a new parser registry with all built-in parsers
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: Vec::new(),
        };

        registry.register(Box::new(json::JsonRelationParser));
        registry.register(Box::new(csv::CsvRelationParser));

        registry
    }

    /// Register a parser
    pub fn register(&mut self, parser: Box<dyn RelationParser>) {
        self.parsers.push(parser);
    }

    /// Find a parser that can handle the given extension
    pub fn find_parser(&self, extension: &str) -> Option<&dyn RelationParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(extension))
            .map(|p| p.as_ref())
    }

    /// Parse content using the appropriate parser for the extension
    ///
    /// LLM output labelled as JSON is sometimes CSV. If the primary parser
    /// fails and the text does not open a JSON object or array, CSV parsing is
    /// tried; the first error is returned when that yields no relationships
    /// either. Truncated or malformed JSON is always an error.
    pub fn parse(&self, content: &str, path: &str, extension: &str) -> Result<RelationshipGraph> {
        let parser = self.find_parser(extension).ok_or_else(|| {
            RelgraphError::Parse(format!("No parser found for extension: {}", extension))
        })?;

        match parser.parse(content, path) {
            Ok(graph) => Ok(graph),
            Err(e) => {
                if looks_like_json(content) {
                    return Err(e);
                }
                let (records, _) = csv::parse_csv_relations(content);
                if records.is_empty() {
                    return Err(e);
                }
                log::warn!(
                    "Parser failed for {} ({}), falling back to CSV: {}",
                    path,
                    extension,
                    e
                );
                Ok(RelationshipGraph::new(records))
            }
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn looks_like_json(content: &str) -> bool {
    strip_code_fences(content).starts_with(['{', '['])
}

/// Return the body of the first fenced code block, or the trimmed text when
/// there is none. LLMs often wrap structured output in ```json fences.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    // skip the info string, e.g. ```csv
    let Some(newline) = after.find('\n') else {
        return trimmed;
    };
    let body = &after[newline + 1..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_registry() {
        let registry = ParserRegistry::new();

        assert!(registry.find_parser("json").is_some());
        assert!(registry.find_parser("csv").is_some());
        assert!(registry.find_parser("txt").is_some());
        assert!(registry.find_parser("xml").is_none());
    }

    #[test]
    fn test_unknown_extension_is_error() {
        let registry = ParserRegistry::new();
        let result = registry.parse("{}", "graph.xml", "xml");
        assert!(matches!(result, Err(RelgraphError::Parse(_))));
    }

    #[test]
    fn test_json_falls_back_to_csv() {
        let registry = ParserRegistry::new();
        let content = "レイン,双方向,仲間,カナデ,勇者パーティー\n";
        let graph = registry.parse(content, "q1.json", "json").unwrap();
        assert_eq!(graph.relationships.len(), 1);
        assert_eq!(graph.relationships[0].target, "カナデ");
    }

    #[test]
    fn test_broken_json_without_rows_keeps_error() {
        let registry = ParserRegistry::new();
        let result = registry.parse(r#"{"relationships": [}"#, "q1.json", "json");
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_json_reply_is_parse_error() {
        let registry = ParserRegistry::new();
        let cut_off = r#"{"center_person": "Lane", "relationships": [{"source": "Lane", "target": "Kanade", "relation_type": "bidirectional", "label": "ally", "group": ""}, {"source": "Lane", "target": "Ari"#;
        let result = registry.parse(cut_off, "reply", "json");
        assert!(matches!(result, Err(RelgraphError::Parse(_))), "{:?}", result);

        let pretty = "```json\n[\n  {\"source\": \"Lane\",\n   \"target\": \"Kanade\",\n   \"label\": \"ally\",\n";
        let result = registry.parse(pretty, "reply", "json");
        assert!(matches!(result, Err(RelgraphError::Parse(_))), "{:?}", result);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("Here you go:\n```csv\nA,B,C,D\n```\nDone"), "A,B,C,D");
        assert_eq!(strip_code_fences("  A,B,C,D  "), "A,B,C,D");
        assert_eq!(strip_code_fences("```\nA,B,C,D"), "A,B,C,D");
    }
}
