use std::collections::BTreeMap;

use crate::license;
use crate::schema::{EVENT_ID, LICENSE};
use crate::table::Table;

/// The (event, license) key of a result row; `None` unless both are set.
pub fn result_pair(results: &Table, row: usize) -> Option<(String, String)> {
    let event = results.get(row, EVENT_ID)?.trim();
    let license = license::normalize_str(results.get(row, LICENSE)?);
    if event.is_empty() || license.is_empty() {
        return None;
    }
    Some((event.to_string(), license))
}

/// Rows sharing the same (event, license) key, for every key used more than once.
pub fn duplicate_pairs(results: &Table) -> BTreeMap<(String, String), Vec<usize>> {
    let mut seen: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for row in 0..results.len() {
        if let Some(pair) = result_pair(results, row) {
            seen.entry(pair).or_default().push(row);
        }
    }
    seen.retain(|_, rows| rows.len() > 1);
    seen
}
