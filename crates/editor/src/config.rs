use std::time::Duration;

use crate::scheduler::SchedulerTimings;
use crate::search::{DEFAULT_ROW_LIMIT, LOAD_MORE_STEP};

/// Timings and view limits of an editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub rearm_delay: Duration,
    pub saved_display: Duration,
    pub notify_interval: Duration,
    /// How long closing waits for a save that is already running.
    pub close_wait: Duration,
    pub row_limit: usize,
    pub load_more_step: usize,
}

impl SessionConfig {
    pub fn timings(&self) -> SchedulerTimings {
        SchedulerTimings {
            debounce: self.debounce,
            rearm_delay: self.rearm_delay,
            saved_display: self.saved_display,
            notify_interval: self.notify_interval,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let timings = SchedulerTimings::default();
        Self {
            debounce: timings.debounce,
            rearm_delay: timings.rearm_delay,
            saved_display: timings.saved_display,
            notify_interval: timings.notify_interval,
            close_wait: Duration::from_secs(5),
            row_limit: DEFAULT_ROW_LIMIT,
            load_more_step: LOAD_MORE_STEP,
        }
    }
}
