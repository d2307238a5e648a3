use std::time::Duration;

use crate::{ConnectionInfo, EpochMillis, PromptId, PromptStats, PromptStatus, RunMode, Settings};

/// Read-only projection answered to `getState`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowView {
    pub run_mode: RunMode,
    pub cursor_index: usize,
    /// 1-based position for display, 0 when there are no prompts.
    pub current_display_index: usize,
    pub stats: PromptStats,
    pub prompts: Vec<PromptRowView>,
    pub settings: Settings,
    pub elapsed: Duration,
    pub remaining: Duration,
    pub progress_percent: f64,
    pub pending_downloads: Vec<PendingDownloadView>,
    pub connection: ConnectionInfo,
    pub last_error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRowView {
    pub prompt_id: PromptId,
    pub text: String,
    pub status: PromptStatus,
    pub error: Option<String>,
    pub created_at: EpochMillis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDownloadView {
    pub prompt_id: PromptId,
    pub completed: usize,
    pub total: usize,
}
