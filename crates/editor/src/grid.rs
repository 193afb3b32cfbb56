use chrono::NaiveDateTime;
use serde::Serialize;
use storage::models::{find_by_license, normalize_gender, result_pair, stamp};
use storage::schema::{EVENT_ID, GENDER, LAST_CHANGED, LICENSE};
use storage::{DatasetKind, Schema, Table, license};
use tracing::debug;

use crate::error::ValidationError;

/// What an edit may consult besides the grid it lands in.
#[derive(Debug, Clone, Copy)]
pub struct CommitContext<'a> {
    /// Competitor table used to autofill result rows.
    pub competitors: Option<&'a Table>,
    /// Event currently picked in the editor, if any.
    pub selected_event: Option<&'a str>,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Committed {
    /// False when the value was already there; nothing to save then.
    pub changed: bool,
    /// Identity columns were copied from a competitor.
    pub autofilled: bool,
    /// Rows were added or removed while restoring the trailing empty row.
    pub reshaped: bool,
}

/// Observer for a committed cell edit: accept it or reject it with a reason.
pub trait CellCommit {
    fn commit(
        &mut self,
        row: usize,
        column: &str,
        value: &str,
        ctx: &CommitContext<'_>,
    ) -> Result<Committed, ValidationError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub visible: usize,
    pub total: usize,
}

/// An editable dataset. The last row is always the single fully empty row
/// where new records are typed in.
#[derive(Debug, Clone)]
pub struct Grid {
    schema: Schema,
    table: Table,
}

impl Grid {
    pub fn new(schema: Schema, table: Table) -> Self {
        let mut grid = Self { schema, table };
        grid.restore_trailing_row();
        grid
    }

    pub fn kind(&self) -> DatasetKind {
        self.schema.kind
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Rows as they would be written to disk.
    pub fn snapshot(&self) -> Table {
        self.table.non_empty_rows()
    }

    fn autofills(&self) -> bool {
        self.schema.kind == DatasetKind::Results
    }

    fn stamps(&self) -> bool {
        self.schema.kind == DatasetKind::Competitors
    }

    /// In the results grid nothing but the first cell can be edited until that
    /// first cell holds a license number.
    pub fn is_locked(&self, row: usize, col: usize) -> bool {
        self.autofills()
            && col != 0
            && self.table.cell(row, 0).is_none_or(|v| v.trim().is_empty())
    }

    pub fn trailing_row(&self) -> usize {
        self.table.len().saturating_sub(1)
    }

    /// New records are entered in the trailing row; returns its index.
    pub fn insert_row(&mut self) -> usize {
        self.restore_trailing_row();
        self.trailing_row()
    }

    /// Deleting the trailing row is a no-op.
    pub fn delete_row(&mut self, row: usize) -> bool {
        if row >= self.trailing_row() {
            return false;
        }
        self.table.remove_row(row);
        self.restore_trailing_row();
        true
    }

    pub fn counts(&self, visible: usize) -> RowCounts {
        RowCounts {
            visible,
            total: (0..self.table.len())
                .filter(|&row| !self.table.is_row_empty(row))
                .count(),
        }
    }

    /// Drops every fully empty row, then appends one. Returns whether the row
    /// layout changed.
    fn restore_trailing_row(&mut self) -> bool {
        let before = self.table.len();
        let last_is_only_empty = before > 0
            && self.table.is_row_empty(before - 1)
            && (0..before - 1).all(|row| !self.table.is_row_empty(row));
        if last_is_only_empty {
            return false;
        }

        let mut row = 0;
        while row < self.table.len() {
            if self.table.is_row_empty(row) {
                self.table.remove_row(row);
            } else {
                row += 1;
            }
        }
        self.table.push_empty_row();
        true
    }

    fn normalize(&self, column: &str, value: &str) -> Result<String, ValidationError> {
        if column == GENDER {
            return normalize_gender(value).map_err(|_| ValidationError::InvalidGender(value.to_string()));
        }
        if self.schema.is_id_like(column) {
            return Ok(license::normalize_str(value));
        }
        Ok(value.to_string())
    }

    /// (event, license) this row would carry after the edit.
    fn prospective_pair(
        &self,
        row: usize,
        column: &str,
        value: &str,
        selected_event: Option<&str>,
    ) -> Option<(String, String)> {
        let current = |name: &str| self.table.get(row, name).unwrap_or_default().trim().to_string();

        let mut event = if column == EVENT_ID {
            value.trim().to_string()
        } else {
            current(EVENT_ID)
        };
        let license = if column == LICENSE {
            license::normalize_str(value)
        } else {
            license::normalize_str(&current(LICENSE))
        };
        if column == LICENSE && event.is_empty() {
            event = selected_event.unwrap_or_default().trim().to_string();
        }

        (!event.is_empty() && !license.is_empty()).then_some((event, license))
    }

    fn check_unique(
        &self,
        row: usize,
        column: &str,
        value: &str,
        selected_event: Option<&str>,
    ) -> Result<(), ValidationError> {
        if column != EVENT_ID && column != LICENSE {
            return Ok(());
        }
        let Some(pair) = self.prospective_pair(row, column, value, selected_event) else {
            return Ok(());
        };
        let taken = (0..self.table.len())
            .filter(|&other| other != row)
            .any(|other| result_pair(&self.table, other).as_ref() == Some(&pair));
        if taken {
            let (event, license) = pair;
            return Err(ValidationError::DuplicatePair { event, license });
        }
        Ok(())
    }

    fn autofill_identity(&mut self, row: usize, competitors: &Table, license: &str) -> bool {
        let Some(source) = find_by_license(competitors, license) else {
            debug!("No competitor with license number {}", license);
            return false;
        };
        // Every column the row shares with the competitor table, license aside.
        let shared: Vec<(usize, String)> = self
            .table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, column)| column.as_str() != LICENSE)
            .filter_map(|(col, column)| {
                competitors
                    .get(source, column)
                    .map(|value| (col, value.to_string()))
            })
            .collect();
        for (col, value) in shared {
            self.table.set(row, col, value);
        }
        true
    }
}

impl CellCommit for Grid {
    fn commit(
        &mut self,
        row: usize,
        column: &str,
        value: &str,
        ctx: &CommitContext<'_>,
    ) -> Result<Committed, ValidationError> {
        let out_of_range = || ValidationError::OutOfRange {
            row,
            column: column.to_string(),
        };
        let col = self.table.column_index(column).ok_or_else(out_of_range)?;
        let previous = self.table.cell(row, col).ok_or_else(out_of_range)?.to_string();

        if self.is_locked(row, col) {
            return Err(ValidationError::Locked);
        }

        let value = self.normalize(column, value)?;
        if value == previous {
            return Ok(Committed::default());
        }

        let mut committed = Committed {
            changed: true,
            ..Default::default()
        };

        if self.autofills() {
            self.check_unique(row, column, &value, ctx.selected_event)?;
        }
        self.table.set(row, col, value.clone());

        if self.autofills() && col == 0 && !value.is_empty() {
            let event_empty = self.table.get(row, EVENT_ID).is_some_and(|v| v.trim().is_empty());
            if event_empty {
                if let Some(event) = ctx.selected_event {
                    self.table.set_by_name(row, EVENT_ID, event.trim());
                }
            }
            if let Some(competitors) = ctx.competitors {
                committed.autofilled = self.autofill_identity(row, competitors, &value);
            }
        }

        if self.stamps() && column != LAST_CHANGED {
            self.table.set_by_name(row, LAST_CHANGED, stamp(ctx.now));
        }

        committed.reshaped = self.restore_trailing_row();
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storage::schema::{CLUB, COMMENT, NAME, PHONE};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 34, 56)
            .unwrap()
    }

    fn ctx<'a>(competitors: Option<&'a Table>, event: Option<&'a str>) -> CommitContext<'a> {
        CommitContext {
            competitors,
            selected_event: event,
            now: now(),
        }
    }

    fn competitors() -> Table {
        let mut table = Table::empty_for(&Schema::competitors());
        let row = table.push_empty_row();
        table.set_by_name(row, LICENSE, "7");
        table.set_by_name(row, NAME, "Kovács Pál");
        table.set_by_name(row, CLUB, "Debreceni SE");
        table.set_by_name(row, PHONE, "+36 1 234");
        table
    }

    fn results(rows: &[(&str, &str)]) -> Grid {
        let mut table = Table::empty_for(&Schema::results());
        for (event, license) in rows {
            let row = table.push_empty_row();
            table.set_by_name(row, EVENT_ID, *event);
            table.set_by_name(row, LICENSE, *license);
        }
        Grid::new(Schema::results(), table)
    }

    fn assert_single_trailing_row(grid: &Grid) {
        let table = grid.table();
        let empty: Vec<usize> = (0..table.len()).filter(|&r| table.is_row_empty(r)).collect();
        assert_eq!(empty, vec![table.len() - 1]);
    }

    #[test]
    fn test_gender_is_normalized_or_rejected() {
        let mut grid = Grid::new(Schema::competitors(), competitors());

        let committed = grid.commit(0, GENDER, " f ", &ctx(None, None)).unwrap();
        assert!(committed.changed);
        assert_eq!(grid.table().get(0, GENDER), Some("F"));

        let err = grid.commit(0, GENDER, "x", &ctx(None, None)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidGender("x".into()));
        assert_eq!(grid.table().get(0, GENDER), Some("F"));
    }

    #[test]
    fn test_stamp_only_on_real_change() {
        let mut grid = Grid::new(Schema::competitors(), competitors());

        let unchanged = grid.commit(0, NAME, "Kovács Pál", &ctx(None, None)).unwrap();
        assert!(!unchanged.changed);
        assert_eq!(grid.table().get(0, LAST_CHANGED), Some(""));

        grid.commit(0, COMMENT, "új", &ctx(None, None)).unwrap();
        assert_eq!(grid.table().get(0, LAST_CHANGED), Some("2024-06-01 12:34"));
    }

    #[test]
    fn test_editing_the_stamp_does_not_restamp() {
        let mut grid = Grid::new(Schema::competitors(), competitors());
        grid.commit(0, LAST_CHANGED, "2020-01-01 00:00", &ctx(None, None))
            .unwrap();
        assert_eq!(grid.table().get(0, LAST_CHANGED), Some("2020-01-01 00:00"));
    }

    #[test]
    fn test_trailing_row_is_locked_until_license_is_set() {
        let mut grid = results(&[]);
        let row = grid.trailing_row();

        let err = grid.commit(row, NAME, "Valaki", &ctx(None, None)).unwrap_err();
        assert_eq!(err, ValidationError::Locked);

        let competitors = competitors();
        let committed = grid
            .commit(row, LICENSE, "7.0", &ctx(Some(&competitors), Some("E1")))
            .unwrap();
        assert!(committed.autofilled);
        assert!(committed.reshaped);

        let table = grid.table();
        assert_eq!(table.get(row, LICENSE), Some("7"));
        assert_eq!(table.get(row, NAME), Some("Kovács Pál"));
        assert_eq!(table.get(row, CLUB), Some("Debreceni SE"));
        assert_eq!(table.get(row, EVENT_ID), Some("E1"));
        assert_single_trailing_row(&grid);
        assert!(!grid.is_locked(row, 1));
    }

    #[test]
    fn test_autofill_copies_every_shared_column() {
        let mut competitors = competitors();
        competitors.set_by_name(0, COMMENT, "sérült váll");
        competitors.insert_column(competitors.columns().len(), "Edzo");
        competitors.set_by_name(0, "Edzo", "Nagy Géza");

        let mut table = Table::empty_for(&Schema::results());
        table.insert_column(table.columns().len(), "Edzo");
        let mut grid = Grid::new(Schema::results(), table);
        let row = grid.trailing_row();

        grid.commit(row, LICENSE, "7", &ctx(Some(&competitors), None))
            .unwrap();

        let table = grid.table();
        assert_eq!(table.get(row, COMMENT), Some("sérült váll"));
        assert_eq!(table.get(row, "Edzo"), Some("Nagy Géza"));
        assert_eq!(table.get(row, PHONE), Some("+36 1 234"));
        assert_eq!(table.get(row, "KKPI_NY"), Some(""));
        assert_eq!(table.get(row, LICENSE), Some("7"));
    }

    #[test]
    fn test_duplicate_pair_is_rejected() {
        let mut grid = results(&[("E1", "5"), ("E2", "5")]);
        let err = grid.commit(1, EVENT_ID, "E1", &ctx(None, None)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicatePair {
                event: "E1".into(),
                license: "5".into()
            }
        );
        assert_eq!(grid.table().get(1, EVENT_ID), Some("E2"));
    }

    #[test]
    fn test_pair_with_empty_half_is_accepted() {
        let mut grid = results(&[("E1", "5"), ("", "6")]);
        grid.commit(1, LICENSE, "5", &ctx(None, None)).unwrap();
        assert_eq!(grid.table().get(1, LICENSE), Some("5"));
    }

    #[test]
    fn test_selected_event_counts_for_empty_event_cell() {
        let mut grid = results(&[("E1", "5")]);
        let row = grid.trailing_row();
        let err = grid.commit(row, LICENSE, "5", &ctx(None, Some("E1"))).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicatePair { .. }));

        grid.commit(row, LICENSE, "5", &ctx(None, Some("E2"))).unwrap();
        assert_eq!(grid.table().get(row, EVENT_ID), Some("E2"));
    }

    #[test]
    fn test_clearing_a_row_collapses_it() {
        let mut grid = Grid::new(Schema::competitors(), competitors());
        for column in [LICENSE, NAME, CLUB, PHONE] {
            grid.commit(0, column, "", &ctx(None, None)).unwrap();
        }
        // The stamp still holds the row.
        assert!(!grid.table().is_row_empty(0));
        let committed = grid.commit(0, LAST_CHANGED, "", &ctx(None, None)).unwrap();
        assert!(committed.reshaped);
        assert_eq!(grid.table().len(), 1);
        assert_single_trailing_row(&grid);
    }

    #[test]
    fn test_invariant_holds_across_inserts_and_deletes() {
        let mut table = Table::empty_for(&Schema::events());
        for id in ["a", "", "", "b", ""] {
            let row = table.push_empty_row();
            table.set_by_name(row, EVENT_ID, id);
        }
        let mut grid = Grid::new(Schema::events(), table);
        assert_eq!(grid.table().len(), 3);
        assert_single_trailing_row(&grid);

        let row = grid.insert_row();
        grid.commit(row, EVENT_ID, "c", &ctx(None, None)).unwrap();
        assert_single_trailing_row(&grid);

        assert!(grid.delete_row(0));
        assert!(!grid.delete_row(grid.trailing_row()));
        assert_single_trailing_row(&grid);
        assert_eq!(grid.counts(2), RowCounts { visible: 2, total: 2 });
    }

    #[test]
    fn test_unknown_column_is_out_of_range() {
        let mut grid = results(&[]);
        assert!(matches!(
            grid.commit(0, "Nope", "1", &ctx(None, None)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
