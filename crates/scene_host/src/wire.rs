//! Mapping between wire DTOs and core messages, events and views.

use std::time::Duration;

use scene_core::{
    EpochMillis, Msg, PromptItem, PromptRowView, PromptStatus, RunMode, Settings, SettingsError,
    UiEvent, WorkflowView,
};
use scene_engine::{
    Inbound, Outbound, WirePendingDownload, WirePrompt, WireRunMode, WireSettings, WireStats,
    WireStatus, WireWorkflowState,
};
use thiserror::Error;

pub const DEFAULT_REJECT_REASON: &str = "submission rejected by page";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("invalid interval: {0} seconds")]
    Interval(f64),
}

/// What an inbound message asks of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Update(Msg),
    GetState,
}

pub fn route(inbound: Inbound) -> Result<Request, WireError> {
    let msg = match inbound {
        Inbound::GetState => return Ok(Request::GetState),
        Inbound::Start {
            prompts,
            settings,
            start_index,
        } => Msg::Start {
            prompts: prompts.map(prompts_from_wire),
            settings: settings_from_wire(&settings)?,
            start_index,
        },
        Inbound::Resume { current_index } => Msg::Resume { current_index },
        Inbound::Pause => Msg::Pause,
        Inbound::Stop => Msg::Stop,
        Inbound::ClearAll => Msg::ClearAll,
        Inbound::RestartFresh => Msg::RestartFresh,
        Inbound::UpdateSettings { settings } => Msg::UpdateSettings(settings_from_wire(&settings)?),
        Inbound::UpdatePrompts { prompts } => Msg::UpdatePrompts(prompts_from_wire(prompts)),
        Inbound::AddPrompts { texts } => Msg::AddPrompts(texts),
        Inbound::ImportText { text } => Msg::ImportText(text),
        Inbound::SubmitResult {
            prompt_id,
            ok: true,
            ..
        } => Msg::SubmitAccepted { prompt_id },
        Inbound::SubmitResult {
            prompt_id,
            ok: false,
            error,
        } => Msg::SubmitRejected {
            prompt_id,
            reason: error
                .filter(|reason| !reason.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string()),
        },
        Inbound::ImageGenerated {
            prompt_id,
            image_urls,
        } => Msg::OutputsReady {
            prompt_id,
            output_urls: image_urls,
        },
        Inbound::GenerationFailed { prompt_id, error } => Msg::GenerationFailed {
            prompt_id,
            reason: error,
        },
        Inbound::DownloadCompleted {
            prompt_id,
            image_index,
        } => Msg::DownloadFinished {
            prompt_id,
            image_index,
        },
        Inbound::DownloadFailed {
            prompt_id,
            image_index,
            error,
        } => Msg::DownloadFailed {
            prompt_id,
            image_index,
            reason: error,
        },
        Inbound::ConnectionStatus {
            connected,
            project_id,
        } => Msg::ConnectionChanged {
            connected,
            project_id,
        },
    };
    Ok(Request::Update(msg))
}

pub fn settings_from_wire(wire: &WireSettings) -> Result<Settings, WireError> {
    if !wire.interval_seconds.is_finite() || wire.interval_seconds <= 0.0 {
        return Err(WireError::Interval(wire.interval_seconds));
    }
    let interval = Duration::try_from_secs_f64(wire.interval_seconds)
        .map_err(|_| WireError::Interval(wire.interval_seconds))?;
    Ok(Settings::new(
        wire.outputs_per_prompt,
        &wire.download_folder_name,
        interval,
    )?)
}

pub fn settings_to_wire(settings: &Settings) -> WireSettings {
    WireSettings {
        outputs_per_prompt: u32::from(settings.outputs_per_prompt()),
        download_folder_name: settings.download_folder_name().to_string(),
        interval_seconds: settings.interval().as_secs_f64(),
    }
}

fn prompts_from_wire(prompts: Vec<WirePrompt>) -> Vec<PromptItem> {
    prompts.into_iter().map(prompt_from_wire).collect()
}

pub fn prompt_from_wire(wire: WirePrompt) -> PromptItem {
    PromptItem::restore(
        wire.id,
        wire.text,
        status_from_wire(wire.status),
        wire.error,
        wire.created_at,
        None,
    )
}

pub fn prompt_to_wire(row: &PromptRowView) -> WirePrompt {
    WirePrompt {
        id: row.prompt_id,
        text: row.text.clone(),
        status: status_to_wire(row.status),
        error: row.error.clone(),
        created_at: row.created_at,
    }
}

pub fn view_to_wire(view: &WorkflowView) -> WireWorkflowState {
    WireWorkflowState {
        run_mode: run_mode_to_wire(view.run_mode),
        cursor_index: view.cursor_index,
        current_index: view.current_display_index,
        prompts: view.prompts.iter().map(prompt_to_wire).collect(),
        settings: settings_to_wire(&view.settings),
        stats: WireStats {
            total: view.stats.total,
            pending: view.stats.pending,
            submitted: view.stats.submitted,
            completed: view.stats.completed,
            failed: view.stats.failed,
        },
        elapsed_seconds: view.elapsed.as_secs_f64(),
        remaining_seconds: view.remaining.as_secs_f64(),
        progress_percent: view.progress_percent,
        pending_downloads: view
            .pending_downloads
            .iter()
            .map(|pending| WirePendingDownload {
                prompt_id: pending.prompt_id,
                completed_count: pending.completed,
                total_expected: pending.total,
            })
            .collect(),
        connected: view.connection.connected,
        project_id: view.connection.project_id.clone(),
        last_error: view.last_error.clone(),
    }
}

pub fn event_to_outbound(event: UiEvent) -> Outbound {
    match event {
        UiEvent::PromptSubmitted {
            prompt_id,
            current_index,
        } => Outbound::PromptSubmitted {
            prompt_id,
            current_index,
        },
        UiEvent::PromptCompleted { prompt_id } => Outbound::PromptCompleted { prompt_id },
        UiEvent::PromptFailed { prompt_id, error } => Outbound::PromptFailed { prompt_id, error },
        UiEvent::WorkflowCompleted => Outbound::WorkflowCompleted,
        UiEvent::ConnectionStatus {
            connected,
            project_id,
        } => Outbound::ConnectionStatus {
            connected,
            project_id,
        },
        UiEvent::Error { message } => Outbound::Error { message },
    }
}

/// Wall-clock milliseconds from chrono, saturating at zero before the epoch.
pub fn epoch_millis_now() -> EpochMillis {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

fn status_from_wire(status: WireStatus) -> PromptStatus {
    match status {
        WireStatus::Pending => PromptStatus::Pending,
        WireStatus::Submitted => PromptStatus::Submitted,
        WireStatus::Completed => PromptStatus::Completed,
        WireStatus::Failed => PromptStatus::Failed,
    }
}

fn status_to_wire(status: PromptStatus) -> WireStatus {
    match status {
        PromptStatus::Pending => WireStatus::Pending,
        PromptStatus::Submitted => WireStatus::Submitted,
        PromptStatus::Completed => WireStatus::Completed,
        PromptStatus::Failed => WireStatus::Failed,
    }
}

fn run_mode_to_wire(mode: RunMode) -> WireRunMode {
    match mode {
        RunMode::Idle => WireRunMode::Idle,
        RunMode::Running => WireRunMode::Running,
        RunMode::Paused => WireRunMode::Paused,
        RunMode::Stopped => WireRunMode::Stopped,
        RunMode::Completed => WireRunMode::Completed,
    }
}
