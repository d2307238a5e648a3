#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use scene_core::{update, Effect, Msg, PromptId, Settings, WorkflowState};

pub const INTERVAL: Duration = Duration::from_secs(10);

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scene_logging::initialize_for_tests);
}

pub fn settings(outputs_per_prompt: u32) -> Settings {
    Settings::new(outputs_per_prompt, "batch", INTERVAL).expect("valid settings")
}

pub fn queued(texts: &[&str]) -> WorkflowState {
    let texts = texts.iter().map(|text| text.to_string()).collect();
    let (state, _) = update(WorkflowState::new(), Msg::AddPrompts(texts), 0);
    state
}

pub fn start(state: WorkflowState, start_index: usize, now: u64) -> (WorkflowState, Vec<Effect>) {
    update(
        state,
        Msg::Start {
            prompts: None,
            settings: settings(2),
            start_index,
        },
        now,
    )
}

pub fn accept(state: WorkflowState, prompt_id: PromptId, now: u64) -> (WorkflowState, Vec<Effect>) {
    update(state, Msg::SubmitAccepted { prompt_id }, now)
}

pub fn submitted_ids(effects: &[Effect]) -> Vec<PromptId> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::SubmitPrompt { prompt_id, .. } => Some(*prompt_id),
            _ => None,
        })
        .collect()
}
