use std::time::Duration;

use crate::{PromptId, Settings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// (Re)arm the periodic dispatch timer. The first tick is due one
    /// interval from now; the immediate dispatch already happened in `update`.
    ArmTimer { interval: Duration },
    DisarmTimer,
    SubmitPrompt {
        prompt_id: PromptId,
        text: String,
        /// Zero-based position in the registry.
        index: usize,
        settings: Settings,
    },
    DownloadOutput {
        prompt_id: PromptId,
        image_index: usize,
        url: String,
        filename: String,
    },
    Notify(UiEvent),
}

/// Fire-and-forget notifications for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    PromptSubmitted {
        prompt_id: PromptId,
        /// 1-based position for display.
        current_index: usize,
    },
    PromptCompleted { prompt_id: PromptId },
    PromptFailed { prompt_id: PromptId, error: String },
    WorkflowCompleted,
    ConnectionStatus {
        connected: bool,
        project_id: Option<String>,
    },
    Error { message: String },
}
