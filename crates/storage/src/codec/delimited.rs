use super::{TableCodec, unnamed_column};
use crate::error::{Result, StorageError};
use crate::table::{CellValue, RawTable, Table};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Comma separated text with a UTF-8 byte order mark, so spreadsheet programs
/// open accented names correctly.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl TableCodec for CsvCodec {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn encode(&self, table: &Table) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(BOM.to_vec());
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<RawTable> {
        let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let columns = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                if name.trim().is_empty() {
                    unnamed_column(idx)
                } else {
                    name.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        Ok(RawTable { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_starts_with_bom_and_quotes_commas() {
        let table = Table::with_rows(
            vec!["Name".into(), "Comment".into()],
            vec![vec!["Kiss, Anna".into(), "line\nbreak".into()]],
        );
        let bytes = CsvCodec.encode(&table).unwrap();
        assert!(bytes.starts_with(BOM));

        let raw = CsvCodec.decode(&bytes).unwrap();
        assert_eq!(raw.columns, vec!["Name".to_string(), "Comment".to_string()]);
        assert_eq!(raw.rows[0][0], CellValue::Text("Kiss, Anna".into()));
        assert_eq!(raw.rows[0][1], CellValue::Text("line\nbreak".into()));
    }

    #[test]
    fn test_decode_without_bom() {
        let raw = CsvCodec.decode(b"a,b\n1,\n").unwrap();
        assert_eq!(raw.rows, vec![vec![CellValue::Text("1".into()), CellValue::Empty]]);
    }
}
