use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationConfig {
    /// Shown event; the latest one in the events table when unset.
    pub event: Option<String>,
    pub refresh: Duration,
    pub cycle: Duration,
    /// Lines per board.
    pub rows: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            event: None,
            refresh: Duration::from_secs(180),
            cycle: Duration::from_secs(10),
            rows: 20,
        }
    }
}
