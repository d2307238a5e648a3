use std::fmt;

pub type PromptId = u64;

/// Milliseconds since the Unix epoch, supplied by the caller's clock.
pub type EpochMillis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PromptStatus {
    Pending,
    Submitted,
    Completed,
    Failed,
}

impl PromptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PromptStatus::Completed | PromptStatus::Failed)
    }

    /// Forward-only progression: `Pending -> Submitted -> {Completed | Failed}`.
    pub fn can_advance_to(self, next: PromptStatus) -> bool {
        matches!(
            (self, next),
            (PromptStatus::Pending, PromptStatus::Submitted)
                | (PromptStatus::Submitted, PromptStatus::Completed)
                | (PromptStatus::Submitted, PromptStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PromptStatus::Pending => "pending",
            PromptStatus::Submitted => "submitted",
            PromptStatus::Completed => "completed",
            PromptStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PromptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptItem {
    pub(crate) id: PromptId,
    pub(crate) text: String,
    pub(crate) status: PromptStatus,
    pub(crate) error: Option<String>,
    pub(crate) created_at: EpochMillis,
    pub(crate) submitted_at: Option<EpochMillis>,
}

impl PromptItem {
    pub(crate) fn new(id: PromptId, text: String, created_at: EpochMillis) -> Self {
        Self {
            id,
            text,
            status: PromptStatus::Pending,
            error: None,
            created_at,
            submitted_at: None,
        }
    }

    /// Rebuilds an item from persisted or wire data. The registry validates
    /// ids and texts when the item is loaded.
    pub fn restore(
        id: PromptId,
        text: impl Into<String>,
        status: PromptStatus,
        error: Option<String>,
        created_at: EpochMillis,
        submitted_at: Option<EpochMillis>,
    ) -> Self {
        let error = if status == PromptStatus::Failed {
            error
        } else {
            None
        };
        Self {
            id,
            text: text.into(),
            status,
            error,
            created_at,
            submitted_at,
        }
    }

    pub fn id(&self) -> PromptId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> PromptStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> EpochMillis {
        self.created_at
    }

    pub fn submitted_at(&self) -> Option<EpochMillis> {
        self.submitted_at
    }
}
