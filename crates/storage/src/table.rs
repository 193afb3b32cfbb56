use serde::Serialize;

use crate::schema::Schema;

/// A cell as read from a spreadsheet, before reconciliation turns it into text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// Display form used for every column that is not a license number.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) if f.is_nan() => String::new(),
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

/// Header plus loosely typed rows, exactly as decoded from a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// In-memory dataset: ordered column names and rows of text cells.
///
/// Every row always has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Empty table shaped with the schema's required columns.
    pub fn empty_for(schema: &Schema) -> Self {
        Self::new(schema.columns.clone())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        self.cell(row, self.column_index(column)?)
    }

    /// Returns false when the coordinates are out of range.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = value.into();
                true
            }
            None => false,
        }
    }

    pub fn set_by_name(&mut self, row: usize, column: &str, value: impl Into<String>) -> bool {
        match self.column_index(column) {
            Some(col) => self.set(row, col, value),
            None => false,
        }
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn push_empty_row(&mut self) -> usize {
        self.rows.push(vec![String::new(); self.columns.len()]);
        self.rows.len() - 1
    }

    pub fn insert_empty_row(&mut self, at: usize) {
        let at = at.min(self.rows.len());
        self.rows.insert(at, vec![String::new(); self.columns.len()]);
    }

    pub fn remove_row(&mut self, at: usize) -> Option<Vec<String>> {
        (at < self.rows.len()).then(|| self.rows.remove(at))
    }

    /// Out-of-range rows count as empty.
    pub fn is_row_empty(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .is_none_or(|cells| cells.iter().all(|c| c.trim().is_empty()))
    }

    /// Snapshot without fully empty rows, as written to disk.
    pub fn non_empty_rows(&self) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
                .cloned()
                .collect(),
        }
    }

    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        let idx = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)).map(String::as_str))
    }

    pub fn insert_column(&mut self, at: usize, name: impl Into<String>) {
        let at = at.min(self.columns.len());
        self.columns.insert(at, name.into());
        for row in &mut self.rows {
            row.insert(at, String::new());
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Moves the given columns to the front in the given order; every other
    /// column follows in its current relative order.
    pub fn reorder(&mut self, required: &[String]) {
        let mut order: Vec<usize> = required
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        let extras: Vec<usize> = (0..self.columns.len())
            .filter(|i| !order.contains(i))
            .collect();
        order.extend(extras);

        if order.iter().enumerate().all(|(pos, &idx)| pos == idx) {
            return;
        }

        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = order.iter().map(|&i| std::mem::take(&mut row[i])).collect();
        }
    }
}
