use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::codec::{CsvCodec, TableCodec};
use crate::error::Result;
use crate::table::{RawTable, Table};

/// `<file name>.autosave-YYYYMMDD-HHMMSS.csv`, extension of the target included.
pub fn recovery_file_name(target: &Path, at: NaiveDateTime) -> String {
    let base = target
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    format!("{}.autosave-{}.csv", base, at.format("%Y%m%d-%H%M%S"))
}

/// Dumps `table` as UTF-8 CSV with a BOM into `dir`, for the user to recover
/// by hand when the real file cannot be written.
pub fn write_recovery(dir: &Path, target: &Path, table: &Table, at: NaiveDateTime) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(recovery_file_name(target, at));
    fs::write(&path, CsvCodec.encode(table)?)?;
    Ok(path)
}

pub fn read_recovery(path: &Path) -> Result<RawTable> {
    CsvCodec.decode(&fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_file_name_keeps_extension_and_adds_timestamp() {
        assert_eq!(
            recovery_file_name(Path::new("database/eredmenyek.xlsx"), at()),
            "eredmenyek.xlsx.autosave-20240309-140507.csv"
        );
        assert_eq!(
            recovery_file_name(Path::new("data.xlsx"), at()),
            "data.xlsx.autosave-20240309-140507.csv"
        );
    }

    #[test]
    fn test_recovery_file_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::with_rows(
            vec!["Versenyengedelyszam".into(), "Name".into()],
            vec![vec!["7".into(), "Tóth Éva".into()]],
        );

        let path = write_recovery(dir.path(), Path::new("data.xlsx"), &table, at()).unwrap();
        assert!(fs::read(&path).unwrap().starts_with(b"\xEF\xBB\xBF"));

        let raw = read_recovery(&path).unwrap();
        assert_eq!(raw.columns, table.columns());
        assert_eq!(raw.rows[0][1], CellValue::Text("Tóth Éva".into()));
    }
}
