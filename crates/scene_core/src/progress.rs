//! Derived timing and progress figures. Nothing here is authoritative; the
//! per-item statuses in the registry are the single source of truth.
use std::time::Duration;

use crate::{EpochMillis, PromptStats};

/// Elapsed-time accounting that survives pause/resume boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunClock {
    accumulated: Duration,
    resumed_at: Option<EpochMillis>,
}

impl RunClock {
    pub fn restore(accumulated: Duration, resumed_at: Option<EpochMillis>) -> Self {
        Self {
            accumulated,
            resumed_at,
        }
    }

    /// Starts a fresh run at `now`, discarding previously accumulated time.
    pub fn start(&mut self, now: EpochMillis) {
        self.accumulated = Duration::ZERO;
        self.resumed_at = Some(now);
    }

    pub fn resume(&mut self, now: EpochMillis) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(now);
        }
    }

    /// Folds the running segment into the accumulated total and stops ticking.
    pub fn freeze(&mut self, now: EpochMillis) {
        if let Some(at) = self.resumed_at.take() {
            self.accumulated += Duration::from_millis(now.saturating_sub(at));
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn elapsed(&self, now: EpochMillis) -> Duration {
        let running = self
            .resumed_at
            .map_or(Duration::ZERO, |at| Duration::from_millis(now.saturating_sub(at)));
        self.accumulated + running
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn resumed_at(&self) -> Option<EpochMillis> {
        self.resumed_at
    }
}

/// Linear projection: every non-terminal item costs one dispatch interval.
pub fn remaining_estimate(stats: &PromptStats, interval: Duration) -> Duration {
    let outstanding = stats.total.saturating_sub(stats.terminal());
    interval.saturating_mul(u32::try_from(outstanding).unwrap_or(u32::MAX))
}

/// Submitted items count as half done; the result is capped at 100.
pub fn progress_percent(stats: &PromptStats) -> f64 {
    if stats.total == 0 {
        return 0.0;
    }
    let done = stats.terminal() as f64 + 0.5 * stats.submitted as f64;
    (done / stats.total as f64 * 100.0).min(100.0)
}
