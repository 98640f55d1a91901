//! Record validation: drop records whose endpoints are empty or placeholders.

use super::RelationshipRecord;

/// Placeholder tokens an LLM (or an echoed CSV header row) puts where an
/// entity name should be. Matched exactly and case-sensitively.
pub const INVALID_NAMES: &[&str] = &[
    "",
    "unknown",
    "subject",
    "object",
    "?",
    "？",
    "None",
    "none",
    "null",
    "NULL",
    "不明",
    "主体",
    "客体",
    "グループ",
    "関係タイプ",
    "関係詳細",
];

pub fn is_invalid_name(name: &str) -> bool {
    INVALID_NAMES.contains(&name)
}

/// Why records were dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub invalid: usize,
    pub empty: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Filtered {
    pub records: Vec<RelationshipRecord>,
    pub stats: FilterStats,
}

/// Keep the records whose trimmed endpoints are both real names.
///
/// Kept records carry the trimmed names; order is preserved. Never fails.
pub fn filter_records(records: &[RelationshipRecord]) -> Filtered {
    let mut filtered = Filtered::default();

    for record in records {
        let source = record.source.trim();
        let target = record.target.trim();

        if source.is_empty() || target.is_empty() {
            filtered.stats.empty += 1;
            continue;
        }

        if is_invalid_name(source) || is_invalid_name(target) {
            log::debug!("Dropping placeholder relationship {:?} -> {:?}", source, target);
            filtered.stats.invalid += 1;
            continue;
        }

        filtered.records.push(RelationshipRecord {
            source: source.to_string(),
            target: target.to_string(),
            ..record.clone()
        });
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RelationKind;

    fn rec(source: &str, target: &str) -> RelationshipRecord {
        RelationshipRecord::new(source, target, RelationKind::Directed, "x")
    }

    #[test]
    fn test_drops_placeholder_names() {
        let records = vec![rec("unknown", "Bob"), rec("Alice", "?"), rec("不明", "レイン"), rec("Alice", "Bob")];
        let filtered = filter_records(&records);
        assert_eq!(filtered.records, vec![rec("Alice", "Bob")]);
        assert_eq!(filtered.stats.invalid, 3);
        assert_eq!(filtered.stats.empty, 0);
    }

    #[test]
    fn test_drops_empty_after_trim() {
        let records = vec![rec("   ", "Bob"), rec("Alice", ""), rec("Alice", "Bob")];
        let filtered = filter_records(&records);
        assert_eq!(filtered.records.len(), 1);
        assert_eq!(filtered.stats.empty, 2);
    }

    #[test]
    fn test_trims_kept_names() {
        let filtered = filter_records(&[rec("  Alice ", "\tBob")]);
        assert_eq!(filtered.records[0].source, "Alice");
        assert_eq!(filtered.records[0].target, "Bob");
    }

    #[test]
    fn test_placeholder_match_is_case_sensitive() {
        let filtered = filter_records(&[rec("Unknown", "Subject")]);
        assert_eq!(filtered.records.len(), 1);
    }

    #[test]
    fn test_placeholder_after_trim() {
        let filtered = filter_records(&[rec(" none ", "Bob")]);
        assert!(filtered.records.is_empty());
        assert_eq!(filtered.stats.invalid, 1);
    }

    #[test]
    fn test_preserves_order_and_idempotent() {
        let records = vec![rec("C", "D"), rec("?", "X"), rec(" A", "B"), rec("C", "D")];
        let once = filter_records(&records);
        let twice = filter_records(&once.records);
        assert_eq!(once.records, twice.records);
        assert_eq!(twice.stats, FilterStats::default());
        assert_eq!(once.records[0].source, "C");
        assert_eq!(once.records[1].source, "A");
        assert_eq!(once.records.len(), 3);
    }

    #[test]
    fn test_self_loop_passes_filter() {
        let filtered = filter_records(&[rec("Alice", "Alice")]);
        assert_eq!(filtered.records.len(), 1);
    }
}
