use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scheduled(Instant),
    Saving,
}

/// Save status shown next to a dataset tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveIndicator {
    #[default]
    Clear,
    /// Unsaved edits are waiting for the debounce window.
    Waiting,
    Saving,
    /// Cleared automatically after a short while.
    Saved,
    /// Stays until the next edit.
    Failed { recovery: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed { recovery: Option<PathBuf> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinishEffects {
    /// Edits arrived during the save and a new save is scheduled.
    pub rearmed: bool,
    /// The user should be told about the failure now.
    pub notify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTimings {
    pub debounce: Duration,
    pub rearm_delay: Duration,
    pub saved_display: Duration,
    pub notify_interval: Duration,
}

impl Default for SchedulerTimings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(10),
            rearm_delay: Duration::from_secs(2),
            saved_display: Duration::from_secs(2),
            notify_interval: Duration::from_secs(60),
        }
    }
}

/// Debounces edits of one dataset into background saves.
///
/// `Idle -> Scheduled(deadline) -> Saving -> Idle`, plus a pending flag for
/// edits that arrive while a save is already scheduled or running. The
/// scheduler never sleeps; the owner asks for [`next_deadline`] and calls back
/// with the current instant.
///
/// [`next_deadline`]: SaveScheduler::next_deadline
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    timings: SchedulerTimings,
    phase: Phase,
    pending: bool,
    unsaved: bool,
    indicator: SaveIndicator,
    indicator_clear_at: Option<Instant>,
    last_notified: Option<Instant>,
}

impl SaveScheduler {
    pub fn new(timings: SchedulerTimings) -> Self {
        Self {
            timings,
            phase: Phase::Idle,
            pending: false,
            unsaved: false,
            indicator: SaveIndicator::Clear,
            indicator_clear_at: None,
            last_notified: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_saving(&self) -> bool {
        self.phase == Phase::Saving
    }

    /// Edits exist that no successful save has written yet.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn indicator(&self) -> &SaveIndicator {
        &self.indicator
    }

    /// Returns true when this edit armed a new deadline.
    pub fn on_edit(&mut self, now: Instant) -> bool {
        self.unsaved = true;
        self.set_indicator(SaveIndicator::Waiting);
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Scheduled(now + self.timings.debounce);
                true
            }
            Phase::Scheduled(_) | Phase::Saving => {
                self.pending = true;
                false
            }
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.phase, Phase::Scheduled(deadline) if deadline <= now)
    }

    /// Moves to `Saving`. The snapshot taken now covers every edit so far,
    /// so the pending flag is cleared. Returns false if a save is running.
    pub fn start_save(&mut self) -> bool {
        if self.phase == Phase::Saving {
            return false;
        }
        self.phase = Phase::Saving;
        self.pending = false;
        self.unsaved = false;
        self.set_indicator(SaveIndicator::Saving);
        true
    }

    pub fn finish_save(&mut self, outcome: SaveOutcome, now: Instant) -> FinishEffects {
        let mut effects = FinishEffects::default();
        self.phase = Phase::Idle;

        match outcome {
            SaveOutcome::Saved => {
                self.indicator = SaveIndicator::Saved;
                self.indicator_clear_at = Some(now + self.timings.saved_display);
            }
            SaveOutcome::Failed { recovery } => {
                self.unsaved = true;
                self.set_indicator(SaveIndicator::Failed { recovery });
                effects.notify = self
                    .last_notified
                    .is_none_or(|at| now.duration_since(at) >= self.timings.notify_interval);
                if effects.notify {
                    self.last_notified = Some(now);
                }
            }
        }

        if self.pending {
            self.pending = false;
            self.phase = Phase::Scheduled(now + self.timings.rearm_delay);
            effects.rearmed = true;
        }
        effects
    }

    /// Drops a scheduled deadline. A running save is not affected.
    pub fn cancel(&mut self) -> bool {
        if let Phase::Scheduled(_) = self.phase {
            self.phase = Phase::Idle;
            return true;
        }
        false
    }

    /// Clears an expired "saved" indicator. Returns true if it changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.indicator_clear_at {
            Some(at) if at <= now => {
                self.set_indicator(SaveIndicator::Clear);
                true
            }
            _ => false,
        }
    }

    /// Earliest instant at which the owner must call back.
    pub fn next_deadline(&self) -> Option<Instant> {
        let save = match self.phase {
            Phase::Scheduled(deadline) => Some(deadline),
            _ => None,
        };
        match (save, self.indicator_clear_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn set_indicator(&mut self, indicator: SaveIndicator) {
        self.indicator = indicator;
        self.indicator_clear_at = None;
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(SchedulerTimings::default())
    }
}
