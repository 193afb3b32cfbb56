pub mod codec;
pub mod config;
pub mod error;
pub mod error_log;
pub mod integrity;
pub mod license;
pub mod models;
pub mod reconcile;
pub mod retry;
pub mod schema;
pub mod store;
pub mod table;

pub use config::StoreConfig;
pub use error::{Result, StorageError};
pub use integrity::IntegrityReport;
pub use retry::RetryPolicy;
pub use schema::{DatasetKind, Schema};
pub use store::{DatasetStore, SaveReport};
pub use table::{CellValue, RawTable, Table};
