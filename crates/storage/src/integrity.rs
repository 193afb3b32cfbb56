use serde::Serialize;
use tracing::warn;

use crate::models::{self, normalize_gender};
use crate::schema::{DatasetKind, EVENT_ID, GENDER};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatePair {
    pub event: String,
    pub license: String,
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidCell {
    pub dataset: &'static str,
    pub row: usize,
    pub value: String,
}

/// Problems already present in the stored data. Nothing here is repaired;
/// editing only prevents new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub duplicate_pairs: Vec<DuplicatePair>,
    pub unknown_events: Vec<String>,
    pub invalid_genders: Vec<InvalidCell>,
}

impl IntegrityReport {
    pub fn check(competitors: &Table, results: &Table, events: &Table) -> Self {
        let mut report = Self::duplicates_only(results);

        let known = models::event_ids(events);
        for id in results.column_values(EVENT_ID).map(str::trim) {
            if !id.is_empty()
                && !known.iter().any(|k| k == id)
                && !report.unknown_events.iter().any(|u| u == id)
            {
                report.unknown_events.push(id.to_string());
            }
        }

        for (kind, table) in [
            (DatasetKind::Competitors, competitors),
            (DatasetKind::Results, results),
        ] {
            for (row, value) in table.column_values(GENDER).enumerate() {
                if normalize_gender(value).is_err() {
                    report.invalid_genders.push(InvalidCell {
                        dataset: kind.as_str(),
                        row,
                        value: value.to_string(),
                    });
                }
            }
        }

        report
    }

    pub fn duplicates_only(results: &Table) -> Self {
        let duplicate_pairs = models::duplicate_pairs(results)
            .into_iter()
            .map(|((event, license), rows)| DuplicatePair {
                event,
                license,
                rows,
            })
            .collect();
        Self {
            duplicate_pairs,
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.duplicate_pairs.is_empty()
            && self.unknown_events.is_empty()
            && self.invalid_genders.is_empty()
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for dup in &self.duplicate_pairs {
            out.push(format!(
                "Event '{}' has {} results for license {} (rows {:?})",
                dup.event,
                dup.rows.len(),
                dup.license,
                dup.rows.iter().map(|r| r + 1).collect::<Vec<_>>()
            ));
        }
        for id in &self.unknown_events {
            out.push(format!("Results reference unknown event '{}'", id));
        }
        for cell in &self.invalid_genders {
            out.push(format!(
                "{} row {} has invalid gender '{}'",
                cell.dataset,
                cell.row + 1,
                cell.value
            ));
        }
        out
    }

    pub fn log_warnings(&self) {
        for warning in self.warnings() {
            warn!("{}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LICENSE, Schema};

    fn results(rows: &[(&str, &str, &str)]) -> Table {
        let mut table = Table::empty_for(&Schema::results());
        for (event, license, gender) in rows {
            let row = table.push_empty_row();
            table.set_by_name(row, EVENT_ID, *event);
            table.set_by_name(row, LICENSE, *license);
            table.set_by_name(row, GENDER, *gender);
        }
        table
    }

    fn events(ids: &[&str]) -> Table {
        let mut table = Table::empty_for(&Schema::events());
        for id in ids {
            let row = table.push_empty_row();
            table.set_by_name(row, EVENT_ID, *id);
        }
        table
    }

    #[test]
    fn test_clean_data_has_no_warnings() {
        let report = IntegrityReport::check(
            &Table::empty_for(&Schema::competitors()),
            &results(&[("E1", "1", "M"), ("E1", "2", "")]),
            &events(&["E1"]),
        );
        assert!(report.is_clean());
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn test_reports_each_kind_of_problem() {
        let report = IntegrityReport::check(
            &Table::empty_for(&Schema::competitors()),
            &results(&[("E1", "1", "M"), ("E1", "1", "F"), ("E9", "2", "x")]),
            &events(&["E1"]),
        );

        assert_eq!(
            report.duplicate_pairs,
            vec![DuplicatePair {
                event: "E1".into(),
                license: "1".into(),
                rows: vec![0, 1],
            }]
        );
        assert_eq!(report.unknown_events, vec!["E9".to_string()]);
        assert_eq!(report.invalid_genders.len(), 1);
        assert_eq!(report.invalid_genders[0].row, 2);
        assert_eq!(report.warnings().len(), 3);
    }
}
