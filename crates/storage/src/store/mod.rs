mod atomic;
mod backup;
mod recovery;

pub use atomic::{AtomicWriter, RenameReplace, Replace};
pub use backup::{backup, backup_path};
pub use recovery::{read_recovery, recovery_file_name, write_recovery};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::codec::{TableCodec, XlsxCodec};
use crate::config::StoreConfig;
use crate::error::{Result, StorageError};
use crate::reconcile::reconcile;
use crate::schema::DatasetKind;
use crate::table::{RawTable, Table};

/// Result of [`DatasetStore::save_or_recover`].
#[derive(Debug)]
pub struct SaveReport {
    pub result: Result<()>,
    /// Recovery CSV written because the save failed.
    pub recovery: Option<PathBuf>,
}

impl SaveReport {
    pub fn is_saved(&self) -> bool {
        self.result.is_ok()
    }

    /// Message for the user when the save failed, naming the recovery copy.
    pub fn failure_message(&self, kind: DatasetKind) -> Option<String> {
        let err = self.result.as_ref().err()?;
        Some(failure_message(kind, err, self.recovery.as_deref()))
    }
}

fn failure_message(kind: DatasetKind, err: &StorageError, recovery: Option<&Path>) -> String {
    match recovery {
        Some(path) => format!(
            "Could not save {}: {}. Your edits were written to {}.",
            kind,
            err,
            path.display()
        ),
        None => format!("Could not save {}: {}. No recovery copy could be written.", kind, err),
    }
}

/// Loads and saves the three datasets of a data directory.
pub struct DatasetStore {
    config: StoreConfig,
    writer: AtomicWriter,
    codec: XlsxCodec,
}

impl DatasetStore {
    pub fn new(config: StoreConfig) -> Self {
        let writer = AtomicWriter::new(config.retry.clone());
        Self {
            config,
            writer,
            codec: XlsxCodec,
        }
    }

    pub fn with_replace(config: StoreConfig, replace: impl Replace + 'static) -> Self {
        let writer = AtomicWriter::with_replace(config.retry.clone(), replace);
        Self {
            config,
            writer,
            codec: XlsxCodec,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self, kind: DatasetKind) -> PathBuf {
        self.config.path(kind)
    }

    /// Primary file, then its backup, then an empty table with the schema's
    /// columns. Whatever was read comes back reconciled.
    pub fn load(&self, kind: DatasetKind) -> Table {
        let schema = kind.schema();
        let path = self.path(kind);

        match self.read(&path) {
            Ok(raw) => {
                debug!(dataset = %kind, rows = raw.rows.len(), "Loaded {}", path.display());
                return reconcile(raw, &schema);
            }
            Err(e) if path.exists() => {
                warn!(dataset = %kind, "Could not read {}: {}", path.display(), e);
            }
            Err(_) => debug!(dataset = %kind, "{} does not exist", path.display()),
        }

        let bak = backup_path(&path);
        match self.read(&bak) {
            Ok(raw) => {
                warn!(dataset = %kind, "Loaded {} from backup {}", kind, bak.display());
                reconcile(raw, &schema)
            }
            Err(e) => {
                if bak.exists() {
                    error!(dataset = %kind, "Backup {} is unreadable too: {}", bak.display(), e);
                } else if path.exists() {
                    error!(dataset = %kind, "No usable copy of {}; starting empty", path.display());
                }
                Table::empty_for(&schema)
            }
        }
    }

    fn read(&self, path: &Path) -> Result<RawTable> {
        let bytes = fs::read(path)?;
        self.codec.decode(&bytes)
    }

    /// Backs up the current file, then atomically replaces it with the
    /// non-empty rows of `table` in schema column order.
    pub fn save(&self, kind: DatasetKind, table: &Table) -> Result<()> {
        let path = self.path(kind);
        backup(&path);

        let mut snapshot = table.non_empty_rows();
        snapshot.reorder(&kind.schema().columns);
        let bytes = self.codec.encode(&snapshot)?;
        self.writer.write(&path, &bytes)?;

        info!(dataset = %kind, rows = snapshot.len(), "Saved {}", path.display());
        Ok(())
    }

    /// Saves `table`; when that fails, writes the same table as a recovery CSV.
    pub fn save_or_recover(&self, kind: DatasetKind, table: &Table) -> SaveReport {
        match self.save(kind, table) {
            Ok(()) => SaveReport {
                result: Ok(()),
                recovery: None,
            },
            Err(e) => {
                error!(dataset = %kind, "Saving {} failed: {}", kind, e);
                let recovery = self
                    .write_recovery(kind, table)
                    .inspect_err(|re| error!(dataset = %kind, "Could not write recovery copy: {}", re))
                    .ok();
                SaveReport {
                    result: Err(e),
                    recovery,
                }
            }
        }
    }

    /// Writes a CSV copy of `table` into the data directory after a failed save.
    pub fn write_recovery(&self, kind: DatasetKind, table: &Table) -> Result<PathBuf> {
        let path = write_recovery(
            &self.config.data_dir,
            &self.path(kind),
            &table.non_empty_rows(),
            Local::now().naive_local(),
        )?;
        warn!(dataset = %kind, "Wrote recovery copy {}", path.display());
        Ok(path)
    }
}
