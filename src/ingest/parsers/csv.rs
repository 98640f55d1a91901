use super::{strip_code_fences, RelationParser};
use crate::error::Result;
use crate::graph::{RelationKind, RelationshipGraph, RelationshipRecord};

/// Minimum fields per row: source, relation_type, label, target.
const MIN_FIELDS: usize = 4;

/// Parser for `source,relation_type,label,target[,group]` rows
pub struct CsvRelationParser;

impl RelationParser for CsvRelationParser {
    fn can_parse(&self, extension: &str) -> bool {
        matches!(extension, "csv" | "txt")
    }

    fn parse(&self, content: &str, path: &str) -> Result<RelationshipGraph> {
        let (records, stats) = parse_csv_relations(content);
        log::debug!(
            "{}: {} relationship rows, {} malformed rows skipped",
            path,
            records.len(),
            stats.malformed
        );
        Ok(RelationshipGraph::new(records))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsvStats {
    /// Rows with fewer than four fields.
    pub malformed: usize,
    /// English header rows that were skipped.
    pub headers: usize,
}

/// Parse delimiter-separated relationship rows.
///
/// Blank rows are ignored, rows with fewer than four fields are skipped and
/// counted, and surrounding code fences are removed first. Fields are trimmed
/// and a quoted field may span lines. Name validation is left to the compiler.
pub fn parse_csv_relations(text: &str) -> (Vec<RelationshipRecord>, CsvStats) {
    let mut records = Vec::new();
    let mut stats = CsvStats::default();

    for fields in split_csv_rows(strip_code_fences(text)) {
        if fields.len() < MIN_FIELDS {
            stats.malformed += 1;
            continue;
        }

        if fields[0].eq_ignore_ascii_case("source") && fields[3].eq_ignore_ascii_case("target") {
            stats.headers += 1;
            continue;
        }

        records.push(RelationshipRecord {
            source: fields[0].clone(),
            target: fields[3].clone(),
            kind: RelationKind::parse(&fields[1]),
            label: fields[2].clone(),
            group: fields.get(4).cloned().unwrap_or_default(),
        });
    }

    (records, stats)
}

/// Split CSV text into rows of trimmed fields. Double quotes group a field,
/// `""` inside quotes is a literal quote, and line breaks inside quotes stay
/// part of the field. Blank rows are dropped.
fn split_csv_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            '\n' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
                push_row(&mut rows, std::mem::take(&mut fields));
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    push_row(&mut rows, fields);

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, fields: Vec<String>) {
    if !(fields.len() == 1 && fields[0].is_empty()) {
        rows.push(fields);
    }
}
