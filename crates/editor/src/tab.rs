use serde::Serialize;
use storage::{DatasetKind, Schema, Table};
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::error::ValidationError;
use crate::grid::{CellCommit, CommitContext, Committed, Grid, RowCounts};
use crate::scheduler::{SaveIndicator, SaveScheduler};
use crate::search::{FilterView, SearchIndex};

/// What a tab currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabView {
    pub kind: DatasetKind,
    pub columns: Vec<String>,
    /// `(row index, cells)` for every shown row, trailing empty row last.
    pub rows: Vec<(usize, Vec<String>)>,
    pub counts: RowCounts,
    pub matched_total: usize,
    pub has_more: bool,
    pub indicator: SaveIndicator,
}

/// One dataset bound to its grid, search filter and save scheduler.
#[derive(Debug, Clone)]
pub struct DatasetTab {
    grid: Grid,
    search: SearchIndex,
    scheduler: SaveScheduler,
    query: String,
    row_limit: usize,
    default_row_limit: usize,
    load_more_step: usize,
}

impl DatasetTab {
    pub fn new(kind: DatasetKind, table: Table, config: &SessionConfig) -> Self {
        let schema: Schema = kind.schema();
        let grid = Grid::new(schema, table);
        let search = SearchIndex::build(grid.table(), &grid.schema().search);
        Self {
            grid,
            search,
            scheduler: SaveScheduler::new(config.timings()),
            query: String::new(),
            row_limit: config.row_limit,
            default_row_limit: config.row_limit,
            load_more_step: config.load_more_step,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.grid.kind()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn table(&self) -> &Table {
        self.grid.table()
    }

    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SaveScheduler {
        &mut self.scheduler
    }

    pub fn snapshot(&self) -> Table {
        self.grid.snapshot()
    }

    /// Applies an edit; a change schedules a save, a rejection leaves
    /// everything as it was.
    pub fn commit(
        &mut self,
        row: usize,
        column: &str,
        value: &str,
        ctx: &CommitContext<'_>,
        now: Instant,
    ) -> Result<Committed, ValidationError> {
        let committed = self.grid.commit(row, column, value, ctx)?;
        if committed.changed {
            if committed.reshaped {
                self.search.rebuild(self.grid.table());
            } else {
                self.search.update_row(self.grid.table(), row);
            }
            self.scheduler.on_edit(now);
        }
        Ok(committed)
    }

    pub fn insert_row(&mut self) -> usize {
        let row = self.grid.insert_row();
        self.search.rebuild(self.grid.table());
        row
    }

    pub fn delete_row(&mut self, row: usize, now: Instant) -> bool {
        if !self.grid.delete_row(row) {
            return false;
        }
        self.search.rebuild(self.grid.table());
        self.scheduler.on_edit(now);
        true
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// A new query starts again from the default row limit.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.row_limit = self.default_row_limit;
    }

    pub fn load_more(&mut self) {
        self.row_limit = self.row_limit.saturating_add(self.load_more_step);
    }

    pub fn filter(&self) -> FilterView {
        self.search.filter(self.grid.table(), &self.query, self.row_limit)
    }

    pub fn counts(&self) -> RowCounts {
        self.grid.counts(self.filter().visible_count())
    }

    pub fn view(&self) -> TabView {
        let filter = self.filter();
        let table = self.grid.table();
        TabView {
            kind: self.kind(),
            columns: table.columns().to_vec(),
            rows: filter
                .rows
                .iter()
                .filter_map(|&row| table.rows().get(row).map(|cells| (row, cells.clone())))
                .collect(),
            counts: self.grid.counts(filter.visible_count()),
            matched_total: filter.matched_total,
            has_more: filter.has_more,
            indicator: self.scheduler.indicator().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use storage::schema::{LICENSE, NAME};

    fn tab_with(names: &[&str], config: &SessionConfig) -> DatasetTab {
        let mut table = Table::empty_for(&Schema::competitors());
        for (idx, name) in names.iter().enumerate() {
            let row = table.push_empty_row();
            table.set_by_name(row, LICENSE, (idx + 1).to_string());
            table.set_by_name(row, NAME, *name);
        }
        DatasetTab::new(DatasetKind::Competitors, table, config)
    }

    fn ctx() -> CommitContext<'static> {
        CommitContext {
            competitors: None,
            selected_event: None,
            now: Local::now().naive_local(),
        }
    }

    #[test]
    fn test_commit_schedules_and_refreshes_search() {
        let mut tab = tab_with(&["Kiss Anna"], &SessionConfig::default());
        tab.set_query("éva");
        assert_eq!(tab.counts(), RowCounts { visible: 0, total: 1 });

        tab.commit(0, NAME, "Tóth Éva", &ctx(), Instant::now())
            .unwrap();
        assert_eq!(tab.counts(), RowCounts { visible: 1, total: 1 });
        assert!(tab.scheduler().has_unsaved_changes());
    }

    #[test]
    fn test_rejected_edit_schedules_nothing() {
        let mut tab = tab_with(&["Kiss Anna"], &SessionConfig::default());
        assert!(tab.commit(0, "Gender", "q", &ctx(), Instant::now()).is_err());
        assert!(!tab.scheduler().has_unsaved_changes());
    }

    #[test]
    fn test_typing_into_trailing_row_adds_a_record() {
        let mut tab = tab_with(&[], &SessionConfig::default());
        let row = tab.insert_row();
        tab.commit(row, NAME, "Új Versenyző", &ctx(), Instant::now())
            .unwrap();

        let view = tab.view();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.counts.total, 1);
        assert_eq!(view.indicator, SaveIndicator::Waiting);
    }

    #[test]
    fn test_load_more_raises_limit_until_query_changes() {
        let config = SessionConfig {
            row_limit: 2,
            load_more_step: 2,
            ..Default::default()
        };
        let mut tab = tab_with(&["a", "b", "c", "d", "e"], &config);
        assert_eq!(tab.counts().visible, 2);
        assert!(tab.filter().has_more);

        tab.load_more();
        assert_eq!(tab.counts().visible, 4);

        tab.set_query("");
        assert_eq!(tab.counts().visible, 2);
    }

    #[test]
    fn test_view_serializes_to_json() {
        let tab = tab_with(&["Kiss Anna"], &SessionConfig::default());
        let json = serde_json::to_value(tab.view()).unwrap();

        assert_eq!(json["kind"], "competitors");
        assert_eq!(json["indicator"]["state"], "clear");
        assert_eq!(json["rows"][0][1][1], "Kiss Anna");
    }
}
