use crate::{PromptId, PromptItem, Settings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User started a run. `prompts` replaces the registry when present.
    Start {
        prompts: Option<Vec<PromptItem>>,
        settings: Settings,
        start_index: usize,
    },
    /// User resumed a paused run from the given position.
    Resume { current_index: usize },
    /// User paused the run.
    Pause,
    /// User stopped the run; progress is kept.
    Stop,
    /// User wiped every prompt and the run state.
    ClearAll,
    /// User asked to run the whole list again from scratch.
    RestartFresh,
    /// User changed settings.
    UpdateSettings(Settings),
    /// User replaced the prompt list.
    UpdatePrompts(Vec<PromptItem>),
    /// User added prompts.
    AddPrompts(Vec<String>),
    /// User imported a text blob; one prompt per non-blank line.
    ImportText(String),
    /// Dispatch timer fired.
    Tick,
    /// The page accepted the prompt submission.
    SubmitAccepted { prompt_id: PromptId },
    /// The page could not take the submission (unreachable, wrong site, ...).
    SubmitRejected { prompt_id: PromptId, reason: String },
    /// No acknowledgement arrived within the host's bounded wait.
    SubmitTimedOut { prompt_id: PromptId },
    /// The page detected rendered outputs for a prompt.
    OutputsReady {
        prompt_id: PromptId,
        output_urls: Vec<String>,
    },
    /// The page gave up on a prompt.
    GenerationFailed { prompt_id: PromptId, reason: String },
    /// One output file was saved. `image_index` is 1-based.
    DownloadFinished {
        prompt_id: PromptId,
        image_index: usize,
    },
    /// One output file could not be saved.
    DownloadFailed {
        prompt_id: PromptId,
        image_index: usize,
        reason: String,
    },
    /// The page reported whether it is attached to the target site.
    ConnectionChanged {
        connected: bool,
        project_id: Option<String>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
