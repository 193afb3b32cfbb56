use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetRead(#[from] calamine::XlsxError),

    #[error("Spreadsheet write error: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Table too large for a worksheet: {0}")]
    TooLarge(String),

    #[error("Could not replace {} after {attempts} attempt(s): {source}", path.display())]
    Replace {
        path: PathBuf,
        attempts: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No license number is left above {max}")]
    LicenseNumbersExhausted { max: u64 },
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// True when the failure came from another process holding the file.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Replace { source, .. } | StorageError::Io(source) => matches!(
                source.kind(),
                std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::ResourceBusy
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}
