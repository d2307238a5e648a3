use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use scene_core::{
    EpochMillis, PendingDownload, PromptItem, PromptRegistry, PromptStatus, RegistryError,
    RunMode, RunSnapshot, Settings, WorkflowState,
};
use scene_engine::{AtomicFileWriter, PersistError};
use scene_logging::{scene_info, scene_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STATE_FILENAME: &str = ".scene_batch_state.ron";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] ron::Error),
    #[error("persisted prompts are inconsistent: {0}")]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Write(#[from] PersistError),
}

/// Key-value style storage for the coordinator's state. Loaded once at
/// startup, written after every mutation.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Option<WorkflowState>, StoreError>;
    fn save(&self, state: &WorkflowState, now: EpochMillis) -> Result<(), StoreError>;
}

/// Stores the state as a RON document next to the outputs.
#[derive(Debug, Clone)]
pub struct RonStateStore {
    dir: PathBuf,
}

impl RonStateStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILENAME)
    }
}

impl StateStore for RonStateStore {
    fn load(&self) -> Result<Option<WorkflowState>, StoreError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        let persisted = decode_state(&content).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        let state = persisted.into_state()?;
        scene_info!(
            "Loaded {} persisted prompts from {:?}",
            state.registry().len(),
            path
        );
        Ok(Some(state))
    }

    fn save(&self, state: &WorkflowState, now: EpochMillis) -> Result<(), StoreError> {
        let content = encode_state(&PersistedState::capture(state, now))?;
        AtomicFileWriter::new(self.dir.clone()).write(STATE_FILENAME, content.as_bytes())?;
        Ok(())
    }
}

fn encode_state(state: &PersistedState) -> Result<String, ron::Error> {
    ron::ser::to_string_pretty(state, ron::ser::PrettyConfig::new())
}

fn decode_state(content: &str) -> Result<PersistedState, ron::error::SpannedError> {
    ron::from_str(content)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PersistedStatus {
    Pending,
    Submitted,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
enum PersistedRunMode {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedPrompt {
    id: u64,
    text: String,
    status: PersistedStatus,
    #[serde(default)]
    error: Option<String>,
    created_at: u64,
    #[serde(default)]
    submitted_at: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSettings {
    outputs_per_prompt: u32,
    download_folder_name: String,
    interval_ms: u64,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PersistedSettings {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            outputs_per_prompt: u32::from(settings.outputs_per_prompt()),
            download_folder_name: settings.download_folder_name().to_string(),
            interval_ms: u64::try_from(settings.interval().as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn into_settings(self) -> Settings {
        Settings::new(
            self.outputs_per_prompt,
            &self.download_folder_name,
            Duration::from_millis(self.interval_ms),
        )
        .unwrap_or_else(|err| {
            scene_warn!("Persisted settings invalid ({err}); using defaults");
            Settings::default()
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedPendingDownload {
    prompt_id: u64,
    total_expected: usize,
    completed: Vec<usize>,
    #[serde(default)]
    failed: Vec<(usize, String)>,
    started_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PersistedRunState {
    run_mode: PersistedRunMode,
    cursor_index: usize,
    elapsed_ms: u64,
    processed: Vec<u64>,
    pending_downloads: Vec<PersistedPendingDownload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PersistedState {
    prompts: Vec<PersistedPrompt>,
    next_prompt_id: u64,
    settings: PersistedSettings,
    workflow_run_state: PersistedRunState,
}

impl PersistedState {
    fn capture(state: &WorkflowState, now: EpochMillis) -> Self {
        let snapshot = state.run_snapshot(now);
        Self {
            prompts: state
                .registry()
                .items()
                .iter()
                .map(|item| PersistedPrompt {
                    id: item.id(),
                    text: item.text().to_string(),
                    status: status_to_persisted(item.status()),
                    error: item.error().map(ToOwned::to_owned),
                    created_at: item.created_at(),
                    submitted_at: item.submitted_at(),
                })
                .collect(),
            next_prompt_id: state.registry().next_id(),
            settings: PersistedSettings::from_settings(state.settings()),
            workflow_run_state: PersistedRunState {
                run_mode: run_mode_to_persisted(snapshot.run_mode),
                cursor_index: snapshot.cursor_index,
                elapsed_ms: u64::try_from(snapshot.elapsed.as_millis()).unwrap_or(u64::MAX),
                processed: snapshot.processed.into_iter().collect(),
                pending_downloads: snapshot
                    .pending_downloads
                    .into_iter()
                    .map(|(prompt_id, pending)| PersistedPendingDownload {
                        prompt_id,
                        total_expected: pending.total_expected,
                        completed: pending.completed.into_iter().collect(),
                        failed: pending.failed.into_iter().collect(),
                        started_at: pending.started_at,
                    })
                    .collect(),
            },
        }
    }

    fn into_state(self) -> Result<WorkflowState, RegistryError> {
        let items = self
            .prompts
            .into_iter()
            .map(|prompt| {
                PromptItem::restore(
                    prompt.id,
                    prompt.text,
                    status_from_persisted(prompt.status),
                    prompt.error,
                    prompt.created_at,
                    prompt.submitted_at,
                )
            })
            .collect();
        let registry = PromptRegistry::from_items(items, self.next_prompt_id)?;
        let run = self.workflow_run_state;
        let snapshot = RunSnapshot {
            run_mode: run_mode_from_persisted(run.run_mode),
            cursor_index: run.cursor_index,
            elapsed: Duration::from_millis(run.elapsed_ms),
            processed: run.processed.into_iter().collect::<BTreeSet<_>>(),
            pending_downloads: run
                .pending_downloads
                .into_iter()
                .map(|pending| {
                    (
                        pending.prompt_id,
                        PendingDownload {
                            total_expected: pending.total_expected,
                            completed: pending.completed.into_iter().collect(),
                            failed: pending.failed.into_iter().collect::<BTreeMap<_, _>>(),
                            started_at: pending.started_at,
                        },
                    )
                })
                .collect(),
        };
        Ok(WorkflowState::restore(
            registry,
            self.settings.into_settings(),
            snapshot,
        ))
    }
}

fn status_to_persisted(status: PromptStatus) -> PersistedStatus {
    match status {
        PromptStatus::Pending => PersistedStatus::Pending,
        PromptStatus::Submitted => PersistedStatus::Submitted,
        PromptStatus::Completed => PersistedStatus::Completed,
        PromptStatus::Failed => PersistedStatus::Failed,
    }
}

fn status_from_persisted(status: PersistedStatus) -> PromptStatus {
    match status {
        PersistedStatus::Pending => PromptStatus::Pending,
        PersistedStatus::Submitted => PromptStatus::Submitted,
        PersistedStatus::Completed => PromptStatus::Completed,
        PersistedStatus::Failed => PromptStatus::Failed,
    }
}

fn run_mode_to_persisted(mode: RunMode) -> PersistedRunMode {
    match mode {
        RunMode::Idle => PersistedRunMode::Idle,
        RunMode::Running => PersistedRunMode::Running,
        RunMode::Paused => PersistedRunMode::Paused,
        RunMode::Stopped => PersistedRunMode::Stopped,
        RunMode::Completed => PersistedRunMode::Completed,
    }
}

fn run_mode_from_persisted(mode: PersistedRunMode) -> RunMode {
    match mode {
        PersistedRunMode::Idle => RunMode::Idle,
        PersistedRunMode::Running => RunMode::Running,
        PersistedRunMode::Paused => RunMode::Paused,
        PersistedRunMode::Stopped => RunMode::Stopped,
        PersistedRunMode::Completed => RunMode::Completed,
    }
}
