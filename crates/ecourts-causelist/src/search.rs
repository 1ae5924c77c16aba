//! Case search over extracted cause-list records.
//!
//! Matching is a case-insensitive substring test against every cell, so partial
//! CNR fragments and case numbers with stray spacing still hit.

use crate::types::{CauseListRecord, CauseListResult, MatchRecord};

/// Records with at least one cell containing `query`, in input order.
///
/// The query is trimmed first. An empty query matches every non-empty record.
pub fn search(records: &[CauseListRecord], query: &str) -> Vec<MatchRecord> {
    search_with_court(records, query, None)
}

/// Search a fetched cause list, tagging each match with the list's court name.
pub fn search_cause_list(cause_list: &CauseListResult, query: &str) -> Vec<MatchRecord> {
    search_with_court(cause_list.records(), query, cause_list.court_name())
}

fn search_with_court(
    records: &[CauseListRecord],
    query: &str,
    court_name: Option<&str>,
) -> Vec<MatchRecord> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|record| record_matches(record, &needle))
        .map(|record| MatchRecord {
            serial: record.serial(),
            record: record.clone(),
            court_name: court_name.map(str::to_string),
        })
        .collect()
}

/// Whether any cell of `record` contains the already lower-cased `needle`.
fn record_matches(record: &CauseListRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return !record.is_empty();
    }
    record
        .cells()
        .iter()
        .any(|cell| cell.to_lowercase().contains(needle))
}
