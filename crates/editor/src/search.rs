use serde::Serialize;
use storage::Table;

pub const DEFAULT_ROW_LIMIT: usize = 500;
pub const LOAD_MORE_STEP: usize = 1000;
/// Matches shown for a two-character query.
pub const SHORT_QUERY_CAP: usize = 100;

/// Lowercase search text per row, built from the searchable columns.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    columns: Vec<String>,
    blobs: Vec<String>,
}

/// Rows to display for one query, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterView {
    pub rows: Vec<usize>,
    /// Matching non-empty rows, shown or not.
    pub matched_total: usize,
    pub has_more: bool,
    /// Index of the trailing empty row when it is part of `rows`.
    pub trailing: Option<usize>,
}

impl FilterView {
    /// Shown rows that hold data.
    pub fn visible_count(&self) -> usize {
        self.rows.len() - usize::from(self.trailing.is_some())
    }
}

impl SearchIndex {
    pub fn build(table: &Table, columns: &[String]) -> Self {
        let mut index = Self {
            columns: columns.to_vec(),
            blobs: Vec::new(),
        };
        index.rebuild(table);
        index
    }

    pub fn rebuild(&mut self, table: &Table) {
        self.blobs = (0..table.len()).map(|row| self.blob_for(table, row)).collect();
    }

    /// Refreshes one row; falls back to a full rebuild when the row count moved.
    pub fn update_row(&mut self, table: &Table, row: usize) {
        if self.blobs.len() != table.len() || row >= self.blobs.len() {
            self.rebuild(table);
            return;
        }
        self.blobs[row] = self.blob_for(table, row);
    }

    pub fn blob(&self, row: usize) -> Option<&str> {
        self.blobs.get(row).map(String::as_str)
    }

    fn blob_for(&self, table: &Table, row: usize) -> String {
        self.columns
            .iter()
            .filter_map(|column| table.get(row, column))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Applies the query rules: an empty query shows the first `row_limit`
    /// rows, one character shows nothing, two characters show at most
    /// [`SHORT_QUERY_CAP`] matches and anything longer shows every match. The
    /// trailing empty row is always shown and never counted.
    pub fn filter(&self, table: &Table, query: &str, row_limit: usize) -> FilterView {
        let query = query.trim().to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();

        let last = table.len().checked_sub(1);
        let trailing = last.filter(|&row| table.is_row_empty(row));

        let data_rows = (0..table.len()).filter(|&row| !table.is_row_empty(row));
        let (matched, cap): (Vec<usize>, usize) = match query.chars().count() {
            0 => (data_rows.collect(), row_limit),
            1 => (Vec::new(), 0),
            n => {
                let cap = if n == 2 { SHORT_QUERY_CAP } else { usize::MAX };
                let matched = data_rows
                    .filter(|&row| {
                        let blob = self.blob(row).unwrap_or_default();
                        terms.iter().all(|term| blob.contains(term))
                    })
                    .collect();
                (matched, cap)
            }
        };

        let matched_total = matched.len();
        let mut rows: Vec<usize> = matched.into_iter().take(cap).collect();
        let has_more = rows.len() < matched_total;
        if let Some(row) = trailing {
            rows.push(row);
        }

        FilterView {
            rows,
            matched_total,
            has_more,
            trailing,
        }
    }
}
