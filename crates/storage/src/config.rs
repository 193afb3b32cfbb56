use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StorageError};
use crate::retry::RetryPolicy;
use crate::schema::DatasetKind;

pub const DEFAULT_DATA_DIR: &str = "database";

/// Where the datasets live and how hard a save tries against a locked file.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub competitors_file: String,
    pub results_file: String,
    pub events_file: String,
    pub retry: RetryPolicy,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            competitors_file: "data.xlsx".to_string(),
            results_file: "eredmenyek.xlsx".to_string(),
            events_file: "versenyek.xlsx".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reads `ROSTER_DATA_DIR`, `ROSTER_SAVE_ATTEMPTS` and
    /// `ROSTER_SAVE_BASE_DELAY_MS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = lookup("ROSTER_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let defaults = RetryPolicy::default();

        let attempts = match lookup("ROSTER_SAVE_ATTEMPTS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                StorageError::Config(format!("ROSTER_SAVE_ATTEMPTS must be a number, got '{}'", raw))
            })?,
            None => defaults.max_attempts,
        };
        let base_delay = match lookup("ROSTER_SAVE_BASE_DELAY_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|_| {
                StorageError::Config(format!(
                    "ROSTER_SAVE_BASE_DELAY_MS must be a number, got '{}'",
                    raw
                ))
            })?),
            None => defaults.base_delay,
        };

        Ok(Self::new(data_dir).with_retry(RetryPolicy::new(
            attempts,
            base_delay,
            defaults.max_delay,
        )))
    }

    pub fn file_name(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::Competitors => &self.competitors_file,
            DatasetKind::Results => &self.results_file,
            DatasetKind::Events => &self.events_file,
        }
    }

    pub fn path(&self, kind: DatasetKind) -> PathBuf {
        self.data_dir.join(self.file_name(kind))
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.data_dir.join("error.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(
            config.path(DatasetKind::Competitors),
            PathBuf::from("database").join("data.xlsx")
        );
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("ROSTER_DATA_DIR", "/srv/verseny"),
            ("ROSTER_SAVE_ATTEMPTS", "3"),
            ("ROSTER_SAVE_BASE_DELAY_MS", "10"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/verseny"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = StoreConfig::from_lookup(lookup(&[("ROSTER_SAVE_ATTEMPTS", "many")]));
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
