mod delimited;
mod xlsx;

pub use delimited::CsvCodec;
pub use xlsx::XlsxCodec;

use crate::error::Result;
use crate::table::{RawTable, Table};

/// A file format a whole table can be written to and read back from.
pub trait TableCodec: Send + Sync {
    fn extension(&self) -> &'static str;

    fn encode(&self, table: &Table) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<RawTable>;
}

/// Column name used for a header cell left blank in the file.
fn unnamed_column(index: usize) -> String {
    format!("Unnamed: {}", index)
}
