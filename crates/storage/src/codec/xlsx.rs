use std::io::Cursor;

use calamine::{Data, ExcelDateTime, Reader, Xlsx};
use chrono::Timelike;
use rust_xlsxwriter::{ColNum, RowNum, Workbook};

use super::{TableCodec, unnamed_column};
use crate::error::{Result, StorageError};
use crate::table::{CellValue, RawTable, Table};

/// First worksheet of an `.xlsx` workbook; row 1 is the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxCodec;

impl TableCodec for XlsxCodec {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn encode(&self, table: &Table) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        for (col, name) in table.columns().iter().enumerate() {
            worksheet.write_string(0, col_num(col)?, name.as_str())?;
        }
        for (idx, row) in table.rows().iter().enumerate() {
            let row_num = row_num(idx + 1)?;
            for (col, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                worksheet.write_string(row_num, col_num(col)?, value.as_str())?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RawTable> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(StorageError::NoWorksheet)??;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(RawTable::default());
        };

        let columns = header
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell_value(cell).to_text() {
                name if name.trim().is_empty() => unnamed_column(idx),
                name => name,
            })
            .collect();
        let rows = rows
            .map(|cells| cells.iter().map(cell_value).collect())
            .collect();

        Ok(RawTable { columns, rows })
    }
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            CellValue::Text(s.clone())
        }
        Data::DateTime(dt) => CellValue::Text(format_datetime(dt)),
    }
}

fn format_datetime(dt: &ExcelDateTime) -> String {
    match dt.as_datetime() {
        Some(naive) if naive.num_seconds_from_midnight() == 0 => {
            naive.format("%Y-%m-%d").to_string()
        }
        Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => dt.as_f64().to_string(),
    }
}

fn row_num(idx: usize) -> Result<RowNum> {
    RowNum::try_from(idx).map_err(|_| StorageError::TooLarge(format!("{} rows", idx)))
}

fn col_num(idx: usize) -> Result<ColNum> {
    ColNum::try_from(idx).map_err(|_| StorageError::TooLarge(format!("{} columns", idx)))
}
