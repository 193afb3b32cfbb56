use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{Result, StorageError};
use crate::retry::RetryPolicy;

/// The final step of an atomic write: move the finished temp file over the
/// destination in one operation.
pub trait Replace: Send + Sync {
    fn replace(&self, from: &Path, to: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenameReplace;

impl Replace for RenameReplace {
    fn replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Writes whole files so that readers only ever see the old or the new
/// content, retrying while another process holds the destination.
pub struct AtomicWriter {
    replace: Box<dyn Replace>,
    policy: RetryPolicy,
}

impl AtomicWriter {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_replace(policy, RenameReplace)
    }

    pub fn with_replace(policy: RetryPolicy, replace: impl Replace + 'static) -> Self {
        Self {
            replace: Box::new(replace),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        // Removed on drop, whatever happens below.
        let tmp_path = tmp.into_temp_path();

        self.policy
            .retry(|attempt| {
                self.replace.replace(&tmp_path, path).inspect_err(|e| {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        "Replacing {} failed: {}",
                        path.display(),
                        e
                    );
                })
            })
            .map_err(|(source, attempts)| StorageError::Replace {
                path: path.to_path_buf(),
                attempts,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` replacements as if the file were locked.
    struct FlakyReplace {
        failures: usize,
        calls: Arc<AtomicUsize>,
    }

    impl Replace for FlakyReplace {
        fn replace(&self, from: &Path, to: &Path) -> io::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "file is open elsewhere"))
            } else {
                fs::rename(from, to)
            }
        }
    }

    fn fast_policy(attempts: usize) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(2))
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.xlsx");
        AtomicWriter::new(fast_policy(1)).write(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert_eq!(leftover_temp_files(path.parent().unwrap()), 0);
    }

    #[test]
    fn test_succeeds_on_last_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        fs::write(&path, b"old").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let writer = AtomicWriter::with_replace(
            fast_policy(7),
            FlakyReplace {
                failures: 6,
                calls: calls.clone(),
            },
        );
        writer.write(&path, b"new").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }

    #[test]
    fn test_exhausted_retries_leave_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        fs::write(&path, b"old").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let writer = AtomicWriter::with_replace(
            fast_policy(3),
            FlakyReplace {
                failures: usize::MAX,
                calls: calls.clone(),
            },
        );
        let err = writer.write(&path, b"new").unwrap_err();

        assert!(err.is_transient());
        match err {
            StorageError::Replace { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(fs::read(&path).unwrap(), b"old");
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }
}
