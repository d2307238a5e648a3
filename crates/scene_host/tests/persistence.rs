mod common;

use std::fs;
use std::time::Duration;

use common::init_logging;
use pretty_assertions::assert_eq;
use scene_core::{update, Msg, PromptStatus, RunMode, Settings, WorkflowState};
use scene_host::persistence::{RonStateStore, StateStore, StoreError, STATE_FILENAME};
use tempfile::TempDir;

fn settings() -> Settings {
    Settings::new(2, "batch", Duration::from_secs(10)).unwrap()
}

fn mid_run_state() -> WorkflowState {
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let (state, _) = update(WorkflowState::new(), Msg::AddPrompts(texts), 1_000);
    let (state, _) = update(
        state,
        Msg::Start {
            prompts: None,
            settings: settings(),
            start_index: 0,
        },
        2_000,
    );
    let (state, _) = update(state, Msg::SubmitAccepted { prompt_id: 1 }, 2_500);
    let (state, _) = update(
        state,
        Msg::OutputsReady {
            prompt_id: 1,
            output_urls: vec![
                "https://cdn.example.com/1.png".to_string(),
                "https://cdn.example.com/2.png".to_string(),
            ],
        },
        3_000,
    );
    let (state, _) = update(
        state,
        Msg::DownloadFinished {
            prompt_id: 1,
            image_index: 1,
        },
        3_100,
    );
    state
}

#[test]
fn missing_file_loads_nothing() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = RonStateStore::new(temp.path().to_path_buf());
    assert!(store.load().unwrap().is_none());
}

#[test]
fn running_state_comes_back_stopped() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = RonStateStore::new(temp.path().to_path_buf());
    let original = mid_run_state();
    assert_eq!(original.run_mode(), RunMode::Running);

    store.save(&original, 5_000).unwrap();
    assert!(temp.path().join(STATE_FILENAME).is_file());
    let loaded = store.load().unwrap().expect("state on disk");

    assert_eq!(loaded.run_mode(), RunMode::Stopped);
    assert_eq!(loaded.in_flight(), None);
    assert_eq!(loaded.registry(), original.registry());
    assert_eq!(loaded.registry().next_id(), 4);
    assert_eq!(loaded.settings(), &settings());
    assert_eq!(loaded.cursor_index(), original.cursor_index());
    assert_eq!(loaded.processed(), original.processed());
    assert_eq!(loaded.pending_downloads(), original.pending_downloads());
    assert_eq!(loaded.view(99_000).elapsed, Duration::from_millis(3_000));
    assert_eq!(
        loaded.registry().items()[0].status(),
        PromptStatus::Submitted
    );
}

#[test]
fn cleared_registry_keeps_id_high_water_mark() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = RonStateStore::new(temp.path().to_path_buf());
    let (state, _) = update(mid_run_state(), Msg::Stop, 4_000);
    let (state, _) = update(state, Msg::ClearAll, 4_100);
    store.save(&state, 4_200).unwrap();

    let loaded = store.load().unwrap().expect("state on disk");
    assert!(loaded.registry().is_empty());
    assert_eq!(loaded.run_mode(), RunMode::Idle);

    let (loaded, _) = update(loaded, Msg::AddPrompts(vec!["d".to_string()]), 5_000);
    assert_eq!(loaded.registry().items()[0].id(), 4);
}

#[test]
fn failed_prompt_keeps_its_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = RonStateStore::new(temp.path().to_path_buf());
    let (state, _) = update(
        mid_run_state(),
        Msg::GenerationFailed {
            prompt_id: 1,
            reason: "blocked by content filter".to_string(),
        },
        3_500,
    );
    store.save(&state, 3_600).unwrap();

    let loaded = store.load().unwrap().expect("state on disk");
    let item = &loaded.registry().items()[0];
    assert_eq!(item.status(), PromptStatus::Failed);
    assert_eq!(item.error(), Some("blocked by content filter"));
    assert!(loaded.pending_downloads().is_empty());
}

#[test]
fn corrupt_file_is_a_parse_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(STATE_FILENAME), "not ron at all {").unwrap();
    let store = RonStateStore::new(temp.path().to_path_buf());

    let err = store.load().unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got {err:?}");
}

#[test]
fn duplicate_ids_on_disk_are_rejected() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let content = r#"(
    prompts: [
        (id: 2, text: "a", status: Pending, created_at: 0),
        (id: 2, text: "b", status: Pending, created_at: 0),
    ],
)"#;
    fs::write(temp.path().join(STATE_FILENAME), content).unwrap();
    let store = RonStateStore::new(temp.path().to_path_buf());

    let err = store.load().unwrap_err();
    assert!(matches!(err, StoreError::Registry(_)), "got {err:?}");
}
