#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use scene_core::{Deadlines, EpochMillis, WorkflowState};
use scene_engine::{
    CodecError, DownloadError, DownloadRequest, Downloader, FailureKind, Outbound, SavedFile,
    WireSettings,
};
use scene_host::bridge::ExtensionPort;
use scene_host::persistence::{StateStore, StoreError};
use scene_host::{Clock, Coordinator, CoordinatorParts};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scene_logging::initialize_for_tests);
}

pub fn wire_settings(outputs_per_prompt: u32, interval_seconds: f64) -> WireSettings {
    WireSettings {
        outputs_per_prompt,
        download_folder_name: "batch".to_string(),
        interval_seconds,
    }
}

#[derive(Clone, Default)]
pub struct RecordingPort {
    sent: Arc<Mutex<Vec<Outbound>>>,
}

impl RecordingPort {
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    /// Everything except the state snapshots pushed after each change.
    pub fn events(&self) -> Vec<Outbound> {
        self.sent()
            .into_iter()
            .filter(|message| !matches!(message, Outbound::WorkflowState(_)))
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ExtensionPort for RecordingPort {
    async fn send(&self, message: Outbound) -> Result<(), CodecError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub initial: Option<WorkflowState>,
    saved: Arc<Mutex<Vec<WorkflowState>>>,
}

impl MemoryStore {
    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<WorkflowState> {
        self.saved.lock().unwrap().last().cloned()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<WorkflowState>, StoreError> {
        Ok(self.initial.clone())
    }

    fn save(&self, state: &WorkflowState, _now: EpochMillis) -> Result<(), StoreError> {
        self.saved.lock().unwrap().push(state.clone());
        Ok(())
    }
}

/// Succeeds for every URL that does not contain `broken`.
#[derive(Clone, Default)]
pub struct FakeDownloader {
    requests: Arc<Mutex<Vec<DownloadRequest>>>,
}

impl FakeDownloader {
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<SavedFile, DownloadError> {
        self.requests.lock().unwrap().push(request.clone());
        if request.url.contains("broken") {
            return Err(DownloadError {
                kind: FailureKind::HttpStatus(404),
                message: "404 Not Found".to_string(),
            });
        }
        Ok(SavedFile {
            path: PathBuf::from(&request.filename),
            byte_len: 4,
            content_type: Some("image/png".to_string()),
        })
    }
}

/// Epoch millis that follow tokio's (pausable) clock.
pub fn tokio_clock() -> Clock {
    let origin = tokio::time::Instant::now();
    Arc::new(move || 1_700_000_000_000 + origin.elapsed().as_millis() as EpochMillis)
}

pub struct Harness {
    pub port: RecordingPort,
    pub store: MemoryStore,
    pub downloader: FakeDownloader,
}

impl Harness {
    pub fn new() -> Self {
        init_logging();
        Self {
            port: RecordingPort::default(),
            store: MemoryStore::default(),
            downloader: FakeDownloader::default(),
        }
    }

    pub fn coordinator(&self, ack_timeout: Duration) -> Coordinator {
        Coordinator::new(CoordinatorParts {
            store: Box::new(self.store.clone()),
            port: Arc::new(self.port.clone()),
            downloader: Arc::new(self.downloader.clone()),
            clock: tokio_clock(),
            deadlines: Deadlines::default(),
            ack_timeout,
        })
    }
}
