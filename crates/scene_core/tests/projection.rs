use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use pretty_assertions::assert_eq;
use scene_core::{
    output_extension, output_filename, progress_percent, remaining_estimate, sanitize_folder_name,
    PromptItem, PromptRegistry, PromptStats, PromptStatus, RunClock, RunMode, RunSnapshot,
    Settings, SettingsError, WorkflowState, DEFAULT_FOLDER_NAME,
};

#[test]
fn progress_counts_submitted_as_half() {
    let stats = PromptStats {
        total: 4,
        pending: 1,
        submitted: 1,
        completed: 1,
        failed: 1,
    };
    assert_eq!(progress_percent(&stats), 62.5);
    assert_eq!(progress_percent(&PromptStats::default()), 0.0);
}

#[test]
fn remaining_estimate_is_linear_in_outstanding_items() {
    let stats = PromptStats {
        total: 5,
        pending: 2,
        submitted: 1,
        completed: 2,
        failed: 0,
    };
    assert_eq!(
        remaining_estimate(&stats, Duration::from_secs(20)),
        Duration::from_secs(60)
    );
}

#[test]
fn run_clock_accumulates_across_segments() {
    let mut clock = RunClock::default();
    clock.start(1_000);
    clock.freeze(4_000);
    assert_eq!(clock.elapsed(100_000), Duration::from_secs(3));

    clock.resume(10_000);
    clock.resume(11_000);
    assert_eq!(clock.elapsed(12_000), Duration::from_secs(5));

    clock.start(20_000);
    assert_eq!(clock.elapsed(20_500), Duration::from_millis(500));
}

#[test]
fn filenames_follow_scene_image_convention() {
    assert_eq!(
        output_filename("Batch", 12, 3, "https://cdn.example.com/img/abc.webp?sig=1"),
        "Batch/Scene 12 Image 3.webp"
    );
    assert_eq!(output_extension("data:image/jpeg;base64,AAAA"), "jpg");
    assert_eq!(output_extension("blob:https://labs.example/1234"), "png");
    assert_eq!(output_extension("https://cdn.example.com/raw"), "png");
    assert_eq!(output_extension("not a url"), "png");
}

#[test]
fn folder_names_are_single_safe_segments() {
    assert_eq!(sanitize_folder_name("My: Scenes/Part 1"), "My_ Scenes_Part 1");
    assert_eq!(sanitize_folder_name("../.."), DEFAULT_FOLDER_NAME);
    assert_eq!(sanitize_folder_name("  "), DEFAULT_FOLDER_NAME);
    assert_eq!(sanitize_folder_name("con"), "con_");

    // Truncation must not leave a trailing dot or space behind.
    let long = format!("{}. tail", "a".repeat(79));
    let name = sanitize_folder_name(&long);
    assert_eq!(name, "a".repeat(79));
    let spaced = format!("{} x", "b".repeat(79));
    assert_eq!(sanitize_folder_name(&spaced), "b".repeat(79));
}

#[test]
fn settings_enforce_bounds() {
    assert_eq!(
        Settings::new(5, "x", Duration::from_secs(1)),
        Err(SettingsError::OutputsOutOfRange(5))
    );
    assert_eq!(
        Settings::new(0, "x", Duration::from_secs(1)),
        Err(SettingsError::OutputsOutOfRange(0))
    );
    assert_eq!(
        Settings::new(2, "x", Duration::ZERO),
        Err(SettingsError::ZeroInterval)
    );
    let settings = Settings::new(4, "a/b", Duration::from_millis(1500)).unwrap();
    assert_eq!(settings.outputs_per_prompt(), 4);
    assert_eq!(settings.download_folder_name(), "a_b");
}

#[test]
fn restore_forces_active_runs_to_stopped() {
    let registry = PromptRegistry::from_items(
        vec![
            PromptItem::restore(1, "a", PromptStatus::Submitted, None, 0, Some(10)),
            PromptItem::restore(2, "b", PromptStatus::Pending, None, 0, None),
        ],
        3,
    )
    .unwrap();
    let snapshot = RunSnapshot {
        run_mode: RunMode::Running,
        cursor_index: 7,
        elapsed: Duration::from_secs(42),
        processed: BTreeSet::from([1, 99]),
        pending_downloads: BTreeMap::new(),
    };

    let mut state = WorkflowState::restore(registry, Settings::default(), snapshot);
    assert_eq!(state.run_mode(), RunMode::Stopped);
    assert!(state.consume_dirty());
    assert_eq!(state.cursor_index(), 2);
    assert_eq!(state.in_flight(), None);
    assert_eq!(state.processed().iter().copied().collect::<Vec<_>>(), vec![1]);
    // The clock is frozen until the user starts again.
    assert_eq!(state.view(1_000_000).elapsed, Duration::from_secs(42));

    let paused = RunSnapshot {
        run_mode: RunMode::Paused,
        ..RunSnapshot::default()
    };
    let state = WorkflowState::restore(PromptRegistry::new(), Settings::default(), paused);
    assert_eq!(state.run_mode(), RunMode::Stopped);

    let stopped = RunSnapshot {
        run_mode: RunMode::Stopped,
        ..RunSnapshot::default()
    };
    let mut state = WorkflowState::restore(PromptRegistry::new(), Settings::default(), stopped);
    assert!(!state.consume_dirty());
}
