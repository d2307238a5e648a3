use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use crate::progress::{progress_percent, remaining_estimate, RunClock};
use crate::view_model::{PendingDownloadView, PromptRowView, WorkflowView};
use crate::{Deadlines, EpochMillis, PromptId, PromptRegistry, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Idle => "idle",
            RunMode::Running => "running",
            RunMode::Paused => "paused",
            RunMode::Stopped => "stopped",
            RunMode::Completed => "completed",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download bookkeeping for one prompt whose outputs were detected.
/// Image indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDownload {
    pub total_expected: usize,
    pub completed: BTreeSet<usize>,
    pub failed: BTreeMap<usize, String>,
    pub started_at: EpochMillis,
}

impl PendingDownload {
    pub fn new(total_expected: usize, started_at: EpochMillis) -> Self {
        Self {
            total_expected,
            completed: BTreeSet::new(),
            failed: BTreeMap::new(),
            started_at,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn is_fully_downloaded(&self) -> bool {
        self.completed.len() >= self.total_expected
    }

    /// Every expected index has either finished or failed.
    pub fn is_settled(&self) -> bool {
        self.completed.len() + self.failed.len() >= self.total_expected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionInfo {
    pub connected: bool,
    pub project_id: Option<String>,
}

/// Run bookkeeping as it is persisted between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSnapshot {
    pub run_mode: RunMode,
    pub cursor_index: usize,
    pub elapsed: Duration,
    pub processed: BTreeSet<PromptId>,
    pub pending_downloads: BTreeMap<PromptId, PendingDownload>,
}

/// Everything the coordinator owns. Only `update` mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowState {
    pub(crate) registry: PromptRegistry,
    pub(crate) settings: Settings,
    pub(crate) deadlines: Deadlines,
    pub(crate) run_mode: RunMode,
    pub(crate) cursor_index: usize,
    pub(crate) clock: RunClock,
    pub(crate) processed: BTreeSet<PromptId>,
    pub(crate) pending_downloads: BTreeMap<PromptId, PendingDownload>,
    pub(crate) in_flight: Option<PromptId>,
    pub(crate) connection: ConnectionInfo,
    pub(crate) last_error: Option<String>,
    dirty: bool,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadlines(mut self, deadlines: Deadlines) -> Self {
        self.deadlines = deadlines;
        self
    }

    /// Rebuilds state loaded from storage. A run that was active when the
    /// previous process went away comes back `Stopped`: nothing resumes
    /// until the user asks for it, and any unacknowledged dispatch is dropped.
    /// That downgrade leaves the state dirty so storage catches up.
    pub fn restore(registry: PromptRegistry, settings: Settings, snapshot: RunSnapshot) -> Self {
        let run_mode = match snapshot.run_mode {
            RunMode::Running | RunMode::Paused => RunMode::Stopped,
            other => other,
        };
        let downgraded = run_mode != snapshot.run_mode;
        let known = |id: &PromptId| registry.find(*id).is_some();
        let processed = snapshot.processed.into_iter().filter(known).collect();
        let pending_downloads = snapshot
            .pending_downloads
            .into_iter()
            .filter(|(id, _)| known(id))
            .collect();
        Self {
            cursor_index: snapshot.cursor_index.min(registry.len()),
            registry,
            settings,
            deadlines: Deadlines::default(),
            run_mode,
            clock: RunClock::restore(snapshot.elapsed, None),
            processed,
            pending_downloads,
            in_flight: None,
            connection: ConnectionInfo::default(),
            last_error: None,
            dirty: downgraded,
        }
    }

    pub fn run_snapshot(&self, now: EpochMillis) -> RunSnapshot {
        RunSnapshot {
            run_mode: self.run_mode,
            cursor_index: self.cursor_index,
            elapsed: self.clock.elapsed(now),
            processed: self.processed.clone(),
            pending_downloads: self.pending_downloads.clone(),
        }
    }

    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn deadlines(&self) -> Deadlines {
        self.deadlines
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor_index
    }

    pub fn clock(&self) -> &RunClock {
        &self.clock
    }

    pub fn processed(&self) -> &BTreeSet<PromptId> {
        &self.processed
    }

    pub fn pending_downloads(&self) -> &BTreeMap<PromptId, PendingDownload> {
        &self.pending_downloads
    }

    pub fn in_flight(&self) -> Option<PromptId> {
        self.in_flight
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    pub fn view(&self, now: EpochMillis) -> WorkflowView {
        let stats = self.registry.stats();
        WorkflowView {
            run_mode: self.run_mode,
            cursor_index: self.cursor_index,
            current_display_index: (self.cursor_index + 1).min(stats.total),
            stats,
            prompts: self
                .registry
                .items()
                .iter()
                .map(|item| PromptRowView {
                    prompt_id: item.id(),
                    text: item.text().to_owned(),
                    status: item.status(),
                    error: item.error().map(ToOwned::to_owned),
                    created_at: item.created_at(),
                })
                .collect(),
            settings: self.settings.clone(),
            elapsed: self.clock.elapsed(now),
            remaining: remaining_estimate(&stats, self.settings.interval()),
            progress_percent: progress_percent(&stats),
            pending_downloads: self
                .pending_downloads
                .iter()
                .map(|(prompt_id, pending)| PendingDownloadView {
                    prompt_id: *prompt_id,
                    completed: pending.completed_count(),
                    total: pending.total_expected,
                })
                .collect(),
            connection: self.connection.clone(),
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Forgets all run bookkeeping; the registry is left to the caller.
    pub(crate) fn reset_run(&mut self) {
        self.run_mode = RunMode::Idle;
        self.cursor_index = 0;
        self.clock.reset();
        self.processed.clear();
        self.pending_downloads.clear();
        self.in_flight = None;
        self.last_error = None;
    }
}
