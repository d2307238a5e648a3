//! Scene batch core: pure workflow state machine, prompt registry and
//! progress projection.
mod effect;
mod msg;
mod naming;
mod progress;
mod prompt;
mod registry;
mod settings;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, UiEvent};
pub use msg::Msg;
pub use naming::{output_filename, output_extension, sanitize_folder_name};
pub use progress::{progress_percent, remaining_estimate, RunClock};
pub use prompt::{EpochMillis, PromptId, PromptItem, PromptStatus};
pub use registry::{PromptRegistry, PromptStats, RegistryError};
pub use settings::{
    Deadlines, Settings, SettingsError, DEFAULT_FOLDER_NAME, MAX_OUTPUTS_PER_PROMPT,
    MIN_OUTPUTS_PER_PROMPT,
};
pub use state::{ConnectionInfo, PendingDownload, RunMode, RunSnapshot, WorkflowState};
pub use update::update;
pub use view_model::{PendingDownloadView, PromptRowView, WorkflowView};
