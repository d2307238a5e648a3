use std::time::Duration;

use scene_logging::{scene_debug, scene_info, scene_warn};

use crate::naming::output_filename;
use crate::state::{ConnectionInfo, PendingDownload};
use crate::{
    Effect, EpochMillis, Msg, PromptId, PromptItem, PromptStatus, RunMode, Settings, UiEvent,
    WorkflowState,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// `now` is the caller's wall clock. Every mutation marks the state dirty so
/// the host persists it before handling the next message.
pub fn update(mut state: WorkflowState, msg: Msg, now: EpochMillis) -> (WorkflowState, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::Start {
            prompts,
            settings,
            start_index,
        } => start(&mut state, prompts, settings, start_index, now, &mut effects),
        Msg::Resume { current_index } => resume(&mut state, current_index, now, &mut effects),
        Msg::Pause => {
            if state.run_mode == RunMode::Running {
                state.run_mode = RunMode::Paused;
                state.clock.freeze(now);
                state.mark_dirty();
                effects.push(Effect::DisarmTimer);
                scene_info!("Workflow paused at position {}", state.cursor_index);
            }
        }
        Msg::Stop => {
            if matches!(state.run_mode, RunMode::Running | RunMode::Paused) {
                state.run_mode = RunMode::Stopped;
                state.clock.freeze(now);
                state.mark_dirty();
                effects.push(Effect::DisarmTimer);
                scene_info!("Workflow stopped at position {}", state.cursor_index);
            }
        }
        Msg::ClearAll => {
            if state.run_mode == RunMode::Running {
                report_error(
                    &mut state,
                    &mut effects,
                    "Cannot clear prompts while the workflow is running".to_string(),
                );
            } else {
                state.registry.clear();
                state.reset_run();
                state.mark_dirty();
                scene_info!("All prompts cleared");
            }
        }
        Msg::RestartFresh => {
            if state.run_mode == RunMode::Running {
                report_error(
                    &mut state,
                    &mut effects,
                    "Cannot restart while the workflow is running".to_string(),
                );
            } else {
                state.registry.reset_statuses();
                state.reset_run();
                state.mark_dirty();
                scene_info!("Prompt statuses reset for a fresh run");
            }
        }
        Msg::UpdateSettings(settings) => {
            let interval_changed = settings.interval() != state.settings.interval();
            if settings != state.settings {
                state.settings = settings;
                state.mark_dirty();
            }
            if interval_changed && state.run_mode == RunMode::Running {
                effects.push(Effect::ArmTimer {
                    interval: state.settings.interval(),
                });
            }
        }
        Msg::UpdatePrompts(items) => replace_prompts(&mut state, items, now, &mut effects),
        Msg::AddPrompts(texts) => add_prompts(&mut state, texts, now),
        Msg::ImportText(raw) => add_prompts(&mut state, split_prompt_lines(&raw), now),
        Msg::Tick => {
            if state.run_mode == RunMode::Running {
                dispatch_step(&mut state, now, &mut effects);
            }
        }
        Msg::SubmitAccepted { prompt_id } => {
            if state.in_flight == Some(prompt_id) {
                state.in_flight = None;
                mark_submitted(&mut state, prompt_id, now, &mut effects);
            } else {
                scene_warn!("Ignoring acknowledgement for prompt {prompt_id}: none pending");
            }
        }
        Msg::SubmitRejected { prompt_id, reason } => {
            reject_submission(&mut state, prompt_id, &reason, now, &mut effects)
        }
        Msg::SubmitTimedOut { prompt_id } => reject_submission(
            &mut state,
            prompt_id,
            "page did not acknowledge the submission",
            now,
            &mut effects,
        ),
        Msg::OutputsReady {
            prompt_id,
            output_urls,
        } => {
            settle_in_flight(&mut state, prompt_id, now, &mut effects);
            outputs_ready(&mut state, prompt_id, output_urls, now, &mut effects);
        }
        Msg::GenerationFailed { prompt_id, reason } => {
            settle_in_flight(&mut state, prompt_id, now, &mut effects);
            fail_prompt(&mut state, prompt_id, reason, now, &mut effects);
        }
        Msg::DownloadFinished {
            prompt_id,
            image_index,
        } => download_finished(&mut state, prompt_id, image_index, now, &mut effects),
        Msg::DownloadFailed {
            prompt_id,
            image_index,
            reason,
        } => download_failed(&mut state, prompt_id, image_index, reason, now, &mut effects),
        Msg::ConnectionChanged {
            connected,
            project_id,
        } => {
            state.connection = ConnectionInfo {
                connected,
                project_id: project_id.clone(),
            };
            state.mark_dirty();
            effects.push(Effect::Notify(UiEvent::ConnectionStatus {
                connected,
                project_id,
            }));
        }
        Msg::NoOp => {}
    }

    (state, effects)
}

fn start(
    state: &mut WorkflowState,
    prompts: Option<Vec<PromptItem>>,
    settings: Settings,
    start_index: usize,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    if state.run_mode == RunMode::Running {
        scene_debug!("Start ignored: workflow already running");
        return;
    }
    if let Some(items) = prompts {
        match state.registry.reconcile(items, now) {
            Ok(registry) => state.registry = registry,
            Err(err) => {
                report_error(state, effects, format!("Cannot start: {err}"));
                return;
            }
        }
    }
    state.settings = settings;
    state.mark_dirty();
    if state.registry.is_empty() {
        report_error(state, effects, "Cannot start: no prompts queued".to_string());
        return;
    }

    let start_index = start_index.min(state.registry.len());
    state.processed = state
        .registry
        .items()
        .iter()
        .enumerate()
        .filter(|(pos, item)| *pos < start_index || item.status().is_terminal())
        .map(|(_, item)| item.id())
        .collect();
    retain_live_downloads(state);
    state.run_mode = RunMode::Running;
    state.cursor_index = start_index;
    state.last_error = None;
    state.clock.start(now);
    scene_info!(
        "Workflow started: {} prompts from position {}, interval {:?}",
        state.registry.len(),
        start_index,
        state.settings.interval()
    );

    effects.push(Effect::ArmTimer {
        interval: state.settings.interval(),
    });
    dispatch_step(state, now, effects);
}

fn resume(state: &mut WorkflowState, current_index: usize, now: EpochMillis, effects: &mut Vec<Effect>) {
    if state.run_mode != RunMode::Paused {
        scene_debug!("Resume ignored in mode {}", state.run_mode);
        return;
    }
    state.run_mode = RunMode::Running;
    state.cursor_index = current_index.min(state.registry.len());
    state.clock.resume(now);
    state.mark_dirty();
    scene_info!("Workflow resumed from position {}", state.cursor_index);

    effects.push(Effect::ArmTimer {
        interval: state.settings.interval(),
    });
    dispatch_step(state, now, effects);
}

fn replace_prompts(
    state: &mut WorkflowState,
    items: Vec<PromptItem>,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    if state.run_mode == RunMode::Running {
        report_error(
            state,
            effects,
            "Cannot replace prompts while the workflow is running".to_string(),
        );
        return;
    }
    let registry = match state.registry.reconcile(items, now) {
        Ok(registry) => registry,
        Err(err) => {
            report_error(state, effects, format!("Rejected prompt list: {err}"));
            return;
        }
    };
    state.processed.retain(|id| registry.find(*id).is_some());
    if state.in_flight.is_some_and(|id| registry.find(id).is_none()) {
        state.in_flight = None;
    }
    state.cursor_index = state.cursor_index.min(registry.len());
    state.registry = registry;
    retain_live_downloads(state);
    state.mark_dirty();
}

/// Download bookkeeping only survives for items still awaiting outputs.
fn retain_live_downloads(state: &mut WorkflowState) {
    let registry = &state.registry;
    state.pending_downloads.retain(|id, _| {
        registry
            .find(*id)
            .is_some_and(|item| item.status() == PromptStatus::Submitted)
    });
}

fn add_prompts(state: &mut WorkflowState, texts: Vec<String>, now: EpochMillis) {
    let added = state.registry.append(texts, now);
    if added.is_empty() {
        return;
    }
    state.mark_dirty();
    scene_info!(
        "Added {} prompts (ids {}..={})",
        added.len(),
        added[0].id(),
        added[added.len() - 1].id()
    );
}

/// One dispatch attempt: fail overdue items, then hand the next eligible
/// pending item to the page, or finish the run when nothing is left.
fn dispatch_step(state: &mut WorkflowState, now: EpochMillis, effects: &mut Vec<Effect>) {
    sweep_overdue(state, now, effects);
    if state.run_mode != RunMode::Running {
        return;
    }
    if let Some(prompt_id) = state.in_flight {
        scene_debug!("Prompt {prompt_id} still awaiting acknowledgement; skipping tick");
        return;
    }

    let next = state
        .registry
        .items()
        .iter()
        .enumerate()
        .skip(state.cursor_index)
        .find(|(_, item)| {
            item.status() == PromptStatus::Pending && !state.processed.contains(&item.id())
        })
        .map(|(pos, item)| (pos, item.id(), item.text().to_owned()));

    match next {
        Some((pos, prompt_id, text)) => {
            state.cursor_index = pos;
            state.in_flight = Some(prompt_id);
            state.mark_dirty();
            scene_info!("Dispatching prompt {prompt_id} at position {pos}");
            effects.push(Effect::SubmitPrompt {
                prompt_id,
                text,
                index: pos,
                settings: state.settings.clone(),
            });
        }
        None => maybe_complete(state, now, effects),
    }
}

fn sweep_overdue(state: &mut WorkflowState, now: EpochMillis, effects: &mut Vec<Effect>) {
    let generation = millis(state.deadlines.generation);
    let download = millis(state.deadlines.download);
    let overdue: Vec<(PromptId, String)> = state
        .registry
        .items()
        .iter()
        .filter(|item| item.status() == PromptStatus::Submitted)
        .filter_map(|item| match state.pending_downloads.get(&item.id()) {
            Some(pending) => (now.saturating_sub(pending.started_at) >= download).then(|| {
                (
                    item.id(),
                    format!(
                        "downloads stalled ({} of {} saved)",
                        pending.completed_count(),
                        pending.total_expected
                    ),
                )
            }),
            None => {
                let since = item.submitted_at()?;
                (now.saturating_sub(since) >= generation)
                    .then(|| (item.id(), "timed out waiting for outputs".to_string()))
            }
        })
        .collect();

    for (prompt_id, reason) in overdue {
        fail_prompt(state, prompt_id, reason, now, effects);
    }
}

fn maybe_complete(state: &mut WorkflowState, now: EpochMillis, effects: &mut Vec<Effect>) {
    if state.run_mode != RunMode::Running || !state.registry.all_terminal() {
        return;
    }
    state.run_mode = RunMode::Completed;
    state.clock.freeze(now);
    state.mark_dirty();
    let stats = state.registry.stats();
    scene_info!(
        "Workflow completed: {} completed, {} failed",
        stats.completed,
        stats.failed
    );
    effects.push(Effect::DisarmTimer);
    effects.push(Effect::Notify(UiEvent::WorkflowCompleted));
}

fn mark_submitted(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    if let Err(err) = state
        .registry
        .set_status(prompt_id, PromptStatus::Submitted, None, now)
    {
        scene_warn!("Prompt {prompt_id} not marked submitted: {err}");
        return;
    }
    state.processed.insert(prompt_id);
    state.mark_dirty();
    let position = state
        .registry
        .position(prompt_id)
        .unwrap_or(state.cursor_index);
    effects.push(Effect::Notify(UiEvent::PromptSubmitted {
        prompt_id,
        current_index: position + 1,
    }));
}

/// A signal about the item still awaiting acknowledgement proves the page
/// took it.
fn settle_in_flight(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    if state.in_flight == Some(prompt_id) {
        state.in_flight = None;
        mark_submitted(state, prompt_id, now, effects);
    }
}

fn reject_submission(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    reason: &str,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    if state.in_flight != Some(prompt_id) {
        scene_warn!("Ignoring dispatch failure for prompt {prompt_id}: none pending");
        return;
    }
    state.in_flight = None;
    // No automatic retry: the item stays pending until the user resumes.
    if state.run_mode == RunMode::Running {
        state.run_mode = RunMode::Paused;
        state.clock.freeze(now);
        effects.push(Effect::DisarmTimer);
    }
    report_error(
        state,
        effects,
        format!("Could not submit prompt {prompt_id}: {reason}"),
    );
}

fn outputs_ready(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    output_urls: Vec<String>,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    let Some(item) = state.registry.find(prompt_id) else {
        scene_warn!("Outputs reported for unknown prompt {prompt_id}");
        return;
    };
    if item.status() != PromptStatus::Submitted {
        scene_debug!(
            "Ignoring outputs for prompt {prompt_id} in status {}",
            item.status()
        );
        return;
    }
    if state.pending_downloads.contains_key(&prompt_id) {
        scene_debug!("Duplicate outputs signal for prompt {prompt_id}");
        return;
    }
    if output_urls.is_empty() {
        fail_prompt(state, prompt_id, "no outputs produced".to_string(), now, effects);
        return;
    }

    scene_info!("Prompt {prompt_id} produced {} outputs", output_urls.len());
    state
        .pending_downloads
        .insert(prompt_id, PendingDownload::new(output_urls.len(), now));
    state.mark_dirty();
    let folder = state.settings.download_folder_name().to_owned();
    for (offset, url) in output_urls.into_iter().enumerate() {
        let image_index = offset + 1;
        let filename = output_filename(&folder, prompt_id, image_index, &url);
        effects.push(Effect::DownloadOutput {
            prompt_id,
            image_index,
            url,
            filename,
        });
    }
}

fn download_finished(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    image_index: usize,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    let (fully_downloaded, settled) = {
        let Some(pending) = state.pending_downloads.get_mut(&prompt_id) else {
            scene_debug!("No downloads pending for prompt {prompt_id}");
            return;
        };
        if image_index == 0 || image_index > pending.total_expected {
            scene_warn!("Download index {image_index} out of range for prompt {prompt_id}");
            return;
        }
        if !pending.completed.insert(image_index) {
            return;
        }
        pending.failed.remove(&image_index);
        (pending.is_fully_downloaded(), pending.is_settled())
    };
    state.mark_dirty();

    if fully_downloaded {
        state.pending_downloads.remove(&prompt_id);
        complete_prompt(state, prompt_id, now, effects);
    } else if settled {
        settle_failed_downloads(state, prompt_id, now, effects);
    }
}

fn download_failed(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    image_index: usize,
    reason: String,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    let settled = {
        let Some(pending) = state.pending_downloads.get_mut(&prompt_id) else {
            scene_debug!("No downloads pending for prompt {prompt_id}");
            return;
        };
        if image_index == 0
            || image_index > pending.total_expected
            || pending.completed.contains(&image_index)
        {
            return;
        }
        scene_warn!("Download {image_index} for prompt {prompt_id} failed: {reason}");
        pending.failed.insert(image_index, reason);
        pending.is_settled()
    };
    state.mark_dirty();

    if settled {
        settle_failed_downloads(state, prompt_id, now, effects);
    }
}

fn settle_failed_downloads(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    if let Some(pending) = state.pending_downloads.remove(&prompt_id) {
        let reason = format!(
            "{} of {} downloads failed",
            pending.failed.len(),
            pending.total_expected
        );
        fail_prompt(state, prompt_id, reason, now, effects);
    }
}

fn complete_prompt(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    if let Err(err) = state
        .registry
        .set_status(prompt_id, PromptStatus::Completed, None, now)
    {
        scene_debug!("Prompt {prompt_id} not completed: {err}");
        return;
    }
    state.mark_dirty();
    scene_info!("Prompt {prompt_id} completed");
    effects.push(Effect::Notify(UiEvent::PromptCompleted { prompt_id }));
    maybe_complete(state, now, effects);
}

/// First terminal status wins; later signals for the same item are no-ops.
fn fail_prompt(
    state: &mut WorkflowState,
    prompt_id: PromptId,
    reason: String,
    now: EpochMillis,
    effects: &mut Vec<Effect>,
) {
    let Some(item) = state.registry.find(prompt_id) else {
        scene_warn!("Failure reported for unknown prompt {prompt_id}");
        return;
    };
    if item.status().is_terminal() {
        scene_debug!("Prompt {prompt_id} already {}; failure ignored", item.status());
        return;
    }
    if let Err(err) = state.registry.set_status(
        prompt_id,
        PromptStatus::Failed,
        Some(reason.clone()),
        now,
    ) {
        scene_warn!("Prompt {prompt_id} not failed: {err}");
        return;
    }
    state.pending_downloads.remove(&prompt_id);
    state.mark_dirty();
    scene_warn!("Prompt {prompt_id} failed: {reason}");
    effects.push(Effect::Notify(UiEvent::PromptFailed {
        prompt_id,
        error: reason,
    }));
    maybe_complete(state, now, effects);
}

fn report_error(state: &mut WorkflowState, effects: &mut Vec<Effect>, message: String) {
    scene_warn!("{message}");
    state.last_error = Some(message.clone());
    state.mark_dirty();
    effects.push(Effect::Notify(UiEvent::Error { message }));
}

fn split_prompt_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
