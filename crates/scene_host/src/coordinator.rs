//! The single task that owns `WorkflowState`.
//!
//! Every inbound frame, effect result and timer tick becomes a `Msg` that is
//! fed through `scene_core::update`. The new state is persisted when dirty,
//! then the returned effects are executed.

use std::sync::Arc;
use std::time::Duration;

use scene_core::{update, Deadlines, Effect, EpochMillis, Msg, WorkflowState};
use scene_engine::{Downloader, Inbound, Outbound};
use scene_logging::{scene_debug, scene_error, scene_info, scene_warn, set_dispatch_tick};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::bridge::ExtensionPort;
use crate::effects::EffectRunner;
use crate::persistence::StateStore;
use crate::wire::{route, view_to_wire, Request};

/// Everything that can wake the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Inbound(Inbound),
    /// A frame arrived that did not decode.
    Malformed(String),
    /// Result of an effect or an internal timeout.
    Signal(Msg),
    /// The extension closed stdin.
    Disconnected,
}

/// Wall clock in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> EpochMillis + Send + Sync>;

pub struct CoordinatorParts {
    pub store: Box<dyn StateStore>,
    pub port: Arc<dyn ExtensionPort>,
    pub downloader: Arc<dyn Downloader>,
    pub clock: Clock,
    pub deadlines: Deadlines,
    pub ack_timeout: Duration,
}

pub struct Coordinator {
    state: WorkflowState,
    store: Box<dyn StateStore>,
    port: Arc<dyn ExtensionPort>,
    runner: EffectRunner,
    clock: Clock,
    events_tx: mpsc::UnboundedSender<HostEvent>,
    events_rx: mpsc::UnboundedReceiver<HostEvent>,
    timer: Option<Interval>,
    ticks: u64,
}

impl Coordinator {
    pub fn new(parts: CoordinatorParts) -> Self {
        let state = match parts.store.load() {
            Ok(Some(state)) => state,
            Ok(None) => WorkflowState::new(),
            Err(err) => {
                scene_warn!("Ignoring persisted state: {}", err);
                WorkflowState::new()
            }
        }
        .with_deadlines(parts.deadlines);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let runner = EffectRunner::new(
            Arc::clone(&parts.port),
            parts.downloader,
            events_tx.clone(),
            parts.ack_timeout,
        );
        let mut coordinator = Self {
            state,
            store: parts.store,
            port: parts.port,
            runner,
            clock: parts.clock,
            events_tx,
            events_rx,
            timer: None,
            ticks: 0,
        };
        // A run restored as stopped is written back straight away.
        if coordinator.state.consume_dirty() {
            let now = (coordinator.clock)();
            coordinator.persist(now);
        }
        coordinator
    }

    /// Handle for producers such as the stdin pump.
    pub fn sender(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.events_tx.clone()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Runs until the extension disconnects and returns the final state.
    pub async fn run(mut self) -> WorkflowState {
        scene_info!(
            "Coordinator started with {} prompts ({})",
            self.state.registry().len(),
            self.state.run_mode()
        );
        loop {
            let event = tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = next_tick(&mut self.timer) => HostEvent::Signal(Msg::Tick),
            };
            if !self.handle(event).await {
                break;
            }
        }
        scene_info!("Coordinator stopped");
        self.state
    }

    /// Processes one event. Returns `false` once the host should exit.
    pub async fn handle(&mut self, event: HostEvent) -> bool {
        match event {
            HostEvent::Inbound(inbound) => match route(inbound) {
                Ok(Request::Update(msg)) => self.apply(msg).await,
                Ok(Request::GetState) => self.send_state().await,
                Err(err) => {
                    scene_warn!("Rejected inbound message: {}", err);
                    self.send(Outbound::Error {
                        message: err.to_string(),
                    })
                    .await;
                }
            },
            HostEvent::Malformed(reason) => {
                self.send(Outbound::Error { message: reason }).await;
            }
            HostEvent::Signal(msg) => self.apply(msg).await,
            HostEvent::Disconnected => {
                let now = (self.clock)();
                self.persist(now);
                return false;
            }
        }
        true
    }

    async fn apply(&mut self, msg: Msg) {
        if matches!(msg, Msg::Tick) {
            self.ticks += 1;
            set_dispatch_tick(self.ticks);
        }
        scene_debug!("Applying {:?}", msg);
        let now = (self.clock)();
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg, now);
        self.state = state;
        let dirty = self.state.consume_dirty();
        if dirty {
            self.persist(now);
        }
        self.runner.settle_ack(self.state.in_flight());
        for effect in effects {
            match effect {
                Effect::ArmTimer { interval } => self.arm_timer(interval),
                Effect::DisarmTimer => self.timer = None,
                other => self.runner.run(other).await,
            }
        }
        if dirty {
            self.send_state().await;
        }
    }

    fn arm_timer(&mut self, period: Duration) {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
    }

    fn persist(&self, now: EpochMillis) {
        if let Err(err) = self.store.save(&self.state, now) {
            scene_error!("Failed to persist workflow state: {}", err);
        }
    }

    async fn send_state(&mut self) {
        let view = self.state.view((self.clock)());
        self.send(Outbound::WorkflowState(view_to_wire(&view))).await;
    }

    async fn send(&mut self, message: Outbound) {
        if let Err(err) = self.port.send(message).await {
            scene_warn!("Failed to send frame: {}", err);
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
