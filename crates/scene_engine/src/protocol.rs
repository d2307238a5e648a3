//! Wire messages exchanged with the browser extension.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSettings {
    pub outputs_per_prompt: u32,
    pub download_folder_name: String,
    pub interval_seconds: f64,
}

impl Default for WireSettings {
    fn default() -> Self {
        Self {
            outputs_per_prompt: 1,
            download_folder_name: "scene-batch".to_string(),
            interval_seconds: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    #[default]
    Pending,
    Submitted,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRunMode {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePrompt {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub status: WireStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSubmission {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireStats {
    pub total: usize,
    pub pending: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePendingDownload {
    pub prompt_id: u64,
    pub completed_count: usize,
    pub total_expected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireWorkflowState {
    pub run_mode: WireRunMode,
    pub cursor_index: usize,
    /// 1-based position for display.
    pub current_index: usize,
    pub prompts: Vec<WirePrompt>,
    pub settings: WireSettings,
    pub stats: WireStats,
    pub elapsed_seconds: f64,
    pub remaining_seconds: f64,
    pub progress_percent: f64,
    pub pending_downloads: Vec<WirePendingDownload>,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Extension -> host. Control commands come from the popup UI, the rest
/// from the content script driving the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Inbound {
    Start {
        #[serde(default)]
        prompts: Option<Vec<WirePrompt>>,
        #[serde(default)]
        settings: WireSettings,
        #[serde(default)]
        start_index: usize,
    },
    Resume {
        #[serde(default)]
        current_index: usize,
    },
    Pause,
    Stop,
    ClearAll,
    RestartFresh,
    UpdateSettings {
        settings: WireSettings,
    },
    UpdatePrompts {
        prompts: Vec<WirePrompt>,
    },
    AddPrompts {
        texts: Vec<String>,
    },
    ImportText {
        text: String,
    },
    GetState,
    SubmitResult {
        prompt_id: u64,
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
    ImageGenerated {
        prompt_id: u64,
        #[serde(default)]
        image_urls: Vec<String>,
    },
    GenerationFailed {
        prompt_id: u64,
        error: String,
    },
    DownloadCompleted {
        prompt_id: u64,
        image_index: usize,
    },
    DownloadFailed {
        prompt_id: u64,
        image_index: usize,
        error: String,
    },
    ConnectionStatus {
        connected: bool,
        #[serde(default)]
        project_id: Option<String>,
    },
}

/// Host -> extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outbound {
    SubmitPrompt {
        prompt: WireSubmission,
        index: usize,
        settings: WireSettings,
    },
    DownloadBlob {
        blob_url: String,
        filename: String,
        prompt_id: u64,
        image_index: usize,
    },
    PromptSubmitted {
        prompt_id: u64,
        current_index: usize,
    },
    PromptCompleted {
        prompt_id: u64,
    },
    PromptFailed {
        prompt_id: u64,
        error: String,
    },
    WorkflowCompleted,
    ConnectionStatus {
        connected: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_id: Option<String>,
    },
    Error {
        message: String,
    },
    WorkflowState(WireWorkflowState),
}
