//! The per-frame driver tying prediction, reconciliation and interpolation together.
//!
//! Network handlers only call [`FrameLoop::dispatch`], which records state for
//! the next frame; all simulation work happens inside [`FrameLoop::step`], in
//! a fixed order:
//! 1. flush the input batch on the batch cadence;
//! 2. reconcile against the newest pending local snapshot (after the flush, so
//!    the inputs just sent are already in the history);
//! 3. advance remote interpolation;
//! 4. advance local prediction from this frame's input;
//! 5. hand the frame to the renderer.

use crate::batcher::InputBatcher;
use crate::clock::TickClock;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::input::{Action, InputCapture, InputEvent};
use crate::interpolation::RemoteInterpolator;
use crate::latency::LatencyEstimator;
use crate::reconciliation::{ReconcileOutcome, ReconciliationEngine};
use crate::registry::PlayerRegistry;
use crate::rendering::{FrameView, Renderer};
use crate::smoothing::CorrectionSmoother;
use log::{info, trace, warn};
use shared::protocol::{GameStateMessage, MatchStart, PlayerSnapshot};
use shared::{advance, snapshot_interval_ms, ClientEvent, CombatData, ServerEvent, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub estimated_tick: Tick,
    /// Number of frames in the batch flushed this frame, if one was sent.
    pub batch_frames: Option<usize>,
    pub reconciliation: Option<ReconcileOutcome>,
    /// Smoothing correction applied to the local player's display this frame.
    pub correction_applied: f32,
}

pub struct FrameLoop {
    config: SyncConfig,
    state: LoopState,
    frame: u64,
    clock: TickClock,
    latency: LatencyEstimator,
    capture: InputCapture,
    batcher: InputBatcher,
    reconciler: ReconciliationEngine,
    smoother: CorrectionSmoother,
    interpolator: RemoteInterpolator,
    registry: PlayerRegistry,
    pending_local: Option<PlayerSnapshot>,
    outbox: Vec<ClientEvent>,
}

impl FrameLoop {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            state: LoopState::Stopped,
            frame: 0,
            clock: TickClock::new(),
            latency: LatencyEstimator::from_config(&config),
            capture: InputCapture::new(CombatData::default()),
            batcher: InputBatcher::new(config.frames_per_batch),
            reconciler: ReconciliationEngine::new(config.divergence_streak),
            smoother: CorrectionSmoother::new(config.smoothing_divisor),
            interpolator: RemoteInterpolator::new(config.snapshot_interval_ms()),
            registry: PlayerRegistry::new(),
            pending_local: None,
            outbox: Vec::new(),
            config,
        }
    }

    /// Starts the loop and attaches its event handling. Starting twice is a no-op.
    pub fn start(&mut self) -> bool {
        if self.state == LoopState::Running {
            return false;
        }
        info!("Frame loop started");
        self.state = LoopState::Running;
        true
    }

    /// Stops the loop and detaches event handling; no further frame runs and
    /// server events are dropped. Stopping twice is a no-op.
    pub fn stop(&mut self) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }
        info!("Frame loop stopped after {} frame(s)", self.frame);
        self.state = LoopState::Stopped;
        self.pending_local = None;
        self.capture.clear();
        true
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn handle_input(&mut self, event: InputEvent, now_ms: f64) {
        if self.is_running() {
            self.capture.handle(event, now_ms);
        }
    }

    /// Feeds a browser-style key event; unmapped keys are ignored.
    pub fn handle_key(&mut self, code: &str, pressed: bool, now_ms: f64) {
        if let Some(action) = Action::from_key_code(code) {
            let event = if pressed {
                InputEvent::Pressed(action)
            } else {
                InputEvent::Released(action)
            };
            self.handle_input(event, now_ms);
        }
    }

    /// Applies one inbound server event. Runs between frames, never during one.
    pub fn dispatch(&mut self, event: ServerEvent, now_ms: f64) -> Result<(), SyncError> {
        if !self.is_running() {
            trace!("Dropping server event while detached: {:?}", event);
            return Ok(());
        }

        match event {
            ServerEvent::Connected { player_id } => {
                info!("Connected as player {}", player_id);
                self.registry.set_local_id(player_id);
                if let Some(local) = self.registry.local() {
                    self.capture.set_combat(local.state.stats.combat);
                }
            }
            ServerEvent::MatchStart(start) => self.anchor_round(&start, now_ms),
            ServerEvent::GameState(message) => self.accept_game_state(message, now_ms)?,
            ServerEvent::Pong { seq, .. } => {
                if let Some(rtt) = self.latency.on_pong(seq, now_ms) {
                    trace!("Probe {} round trip {:.1}ms", seq, rtt);
                }
            }
            ServerEvent::LatencyProbe(probe) => {
                self.outbox.push(ClientEvent::ProbeReply(probe));
            }
            ServerEvent::LatencyAck { latency_ms, .. } => {
                self.latency.on_latency_ack(latency_ms);
            }
            ServerEvent::PlayerJoined(snapshot) => {
                self.registry.join(&snapshot);
                if self.registry.is_local(snapshot.id) {
                    self.capture.set_combat(snapshot.stats.combat);
                }
            }
            ServerEvent::PlayerLeft { id } => {
                if self.registry.is_local(id) {
                    warn!("Local player {} removed by server", id);
                    self.pending_local = None;
                }
                self.registry.leave(id);
            }
            ServerEvent::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                return Err(SyncError::Disconnected(reason));
            }
        }
        Ok(())
    }

    fn anchor_round(&mut self, start: &MatchStart, now_ms: f64) {
        let delay = self.latency.one_way_delay_ms();
        self.clock.anchor(start.server_tick, start.tick_rate, delay, now_ms);
        self.interpolator.set_snapshot_interval_ms(snapshot_interval_ms(
            self.config.ticks_per_snapshot,
            start.tick_rate.max(1),
        ));
        self.batcher.reset(self.frame);
        self.reconciler.reset();
        self.smoother.reset();
        self.pending_local = None;
    }

    /// Applies every snapshot for a known player, then reports the first id
    /// that could not be placed.
    fn accept_game_state(
        &mut self,
        message: GameStateMessage,
        now_ms: f64,
    ) -> Result<(), SyncError> {
        let mut rejected = None;
        for snapshot in message.players {
            if self.registry.is_local(snapshot.id) {
                if self.registry.local().is_none() {
                    rejected.get_or_insert(SyncError::MissingLocalPlayer(snapshot.id));
                    continue;
                }
                // Only the newest one is reconciled next frame.
                self.pending_local = Some(snapshot);
                continue;
            }

            match self.registry.get_mut(snapshot.id) {
                Some(entry) => self.interpolator.on_snapshot(entry, &snapshot, now_ms),
                None => {
                    rejected.get_or_insert(SyncError::UnknownPlayer(snapshot.id));
                }
            }
        }

        match rejected {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Runs one frame. Returns `None` without doing anything while stopped.
    pub fn step<R: Renderer + ?Sized>(
        &mut self,
        now_ms: f64,
        renderer: &mut R,
    ) -> Option<FrameReport> {
        if !self.is_running() {
            return None;
        }
        let frame = self.frame;

        if let Some(probe) = self.latency.poll_probe(now_ms) {
            self.outbox.push(probe);
        }

        let mut batch_frames = None;
        if self.batcher.take_flush_slot(frame) {
            if let Some(batch) = self.batcher.flush(&self.clock, now_ms) {
                batch_frames = Some(batch.frames.len());
                self.outbox.push(ClientEvent::InputBatch(batch));
            }
        }

        let estimated_tick = self.clock.estimate_current_tick(now_ms);
        let reconciliation = self.reconcile_pending(estimated_tick);

        for entry in self.registry.remotes_mut() {
            self.interpolator.advance(entry, now_ms);
        }

        let correction_applied = self.predict_local(frame, now_ms);

        renderer.render(&FrameView {
            frame,
            estimated_tick,
            latency_ms: self.latency.latency_ms(),
            players: &self.registry,
        });

        self.frame += 1;
        Some(FrameReport {
            frame,
            estimated_tick,
            batch_frames,
            reconciliation,
            correction_applied,
        })
    }

    fn reconcile_pending(&mut self, current_tick: Tick) -> Option<ReconcileOutcome> {
        let snapshot = self.pending_local.take()?;
        let entry = self.registry.local_mut()?;

        let outcome = self.reconciler.reconcile(
            &mut entry.state,
            &snapshot,
            &mut self.batcher,
            current_tick,
        );
        self.smoother.begin(outcome.correction_error);
        entry.render.x = entry.state.x + self.smoother.offset();
        entry.render.height = entry.state.height;
        Some(outcome)
    }

    /// Local prediction only runs once the round is anchored; before that the
    /// display simply follows the server.
    fn predict_local(&mut self, frame: u64, now_ms: f64) -> f32 {
        let Some(entry) = self.registry.local_mut() else {
            return 0.0;
        };

        if self.clock.is_anchored() {
            let flags = self.capture.flags(now_ms);
            self.batcher.record(flags, frame, &self.clock, now_ms);
            entry.state = advance(&entry.state, &flags);
        }

        let applied = self.smoother.step();
        entry.render.x = entry.state.x + self.smoother.offset();
        entry.render.height = entry.state.height;
        applied
    }

    /// Takes every event queued for the server since the last call.
    pub fn drain_outbound(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn latency(&self) -> &LatencyEstimator {
        &self.latency
    }

    pub fn capture(&self) -> &InputCapture {
        &self.capture
    }

    pub fn batcher(&self) -> &InputBatcher {
        &self.batcher
    }

    pub fn reconciler(&self) -> &ReconciliationEngine {
        &self.reconciler
    }

    pub fn smoother(&self) -> &CorrectionSmoother {
        &self.smoother
    }
}
