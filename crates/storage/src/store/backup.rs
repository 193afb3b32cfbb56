use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// `<path>.bak`, next to the file it protects.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Copies the current file to its backup slot. A missing source is not an
/// error and a failed copy only logs; the save goes ahead either way.
pub fn backup(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }
    let target = backup_path(path);
    match fs::copy(path, &target) {
        Ok(bytes) => {
            debug!(bytes, "Backed up {} to {}", path.display(), target.display());
            Some(target)
        }
        Err(e) => {
            warn!("Could not back up {}: {}", path.display(), e);
            None
        }
    }
}
