use storage::StorageError;
use thiserror::Error;

/// A cell edit the grid refused; the cell keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid gender '{0}': use M, F or leave it empty")]
    InvalidGender(String),

    #[error("Event '{event}' already has a result for license number {license}")]
    DuplicatePair { event: String, license: String },

    #[error("Fill in the license number first")]
    Locked,

    #[error("No cell at row {row}, column '{column}'")]
    OutOfRange { row: usize, column: String },
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Editing session has shut down")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, EditorError>;
