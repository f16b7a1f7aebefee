//! Server reconciliation for the locally controlled player.
//!
//! An authoritative snapshot replaces the local simulation state, then every
//! input the server has not consumed yet is replayed on top of it through the
//! shared movement step. The difference between the old prediction and the
//! replayed result is handed back as a correction error for smoothing rather
//! than applied to the display at once.

use crate::batcher::InputBatcher;
use crate::registry::merge_authoritative;
use log::{debug, error, warn};
use shared::protocol::PlayerSnapshot;
use shared::{advance, PlayerState, Tick};

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub last_processed_tick: Tick,
    /// True when the acknowledgement was zero or stale and nothing was replayed.
    pub replay_skipped: bool,
    pub replayed_history: usize,
    pub replayed_pending: usize,
    /// Ticks in the replay window with no recorded input.
    pub missing_ticks: u64,
    /// The server acknowledged a tick this client has no record of.
    pub history_gap: bool,
    /// Predicted x before reconciliation minus replayed x.
    pub correction_error: f32,
    pub pruned: usize,
}

#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    last_processed_tick: Tick,
    gap_streak: u32,
    divergence_streak: u32,
    reconciliations: u64,
}

impl ReconciliationEngine {
    pub fn new(divergence_streak: u32) -> Self {
        Self {
            last_processed_tick: 0,
            gap_streak: 0,
            divergence_streak: divergence_streak.max(1),
            reconciliations: 0,
        }
    }

    pub fn last_processed_tick(&self) -> Tick {
        self.last_processed_tick
    }

    pub fn reconciliations(&self) -> u64 {
        self.reconciliations
    }

    /// True once history gaps have persisted for the configured streak.
    pub fn is_diverging(&self) -> bool {
        self.gap_streak >= self.divergence_streak
    }

    /// Forgets the previous round's acknowledgements.
    pub fn reset(&mut self) {
        self.last_processed_tick = 0;
        self.gap_streak = 0;
    }

    /// Reconciles `local` against `snapshot`, replaying from `batcher`.
    ///
    /// A missing history entry never aborts the replay; the available subset
    /// is used and the gap is reported in the outcome and the log.
    pub fn reconcile(
        &mut self,
        local: &mut PlayerState,
        snapshot: &PlayerSnapshot,
        batcher: &mut InputBatcher,
        current_tick: Tick,
    ) -> ReconcileOutcome {
        self.reconciliations += 1;
        let predicted_x = local.x;

        merge_authoritative(local, snapshot);

        let last_processed_tick = snapshot.last_processed_tick.unwrap_or(0);
        if last_processed_tick == 0 || last_processed_tick <= self.last_processed_tick {
            debug!(
                "Skipping replay: acknowledged tick {} (previous {})",
                last_processed_tick, self.last_processed_tick
            );
            return ReconcileOutcome {
                last_processed_tick,
                replay_skipped: true,
                replayed_history: 0,
                replayed_pending: 0,
                missing_ticks: 0,
                history_gap: false,
                correction_error: predicted_x - local.x,
                pruned: 0,
            };
        }
        self.last_processed_tick = last_processed_tick;

        let history_gap = !batcher.history().contains(last_processed_tick);

        let mut state = local.clone();
        let mut replayed_history = 0;
        for input in batcher.history().range(last_processed_tick, current_tick) {
            state = advance(&state, &input.flags);
            replayed_history += 1;
        }

        // Inputs recorded since the last flush are newer than anything in the
        // history, except frames that shared an already acknowledged tick.
        let mut replayed_pending = 0;
        let mut pending_in_window = 0;
        for input in batcher.pending() {
            if matches!(input.tick, Some(t) if t <= last_processed_tick) {
                continue;
            }
            state = advance(&state, &input.flags);
            replayed_pending += 1;
            if matches!(input.tick, Some(t) if t > last_processed_tick && t <= current_tick) {
                pending_in_window += 1;
            }
        }

        let window = current_tick.saturating_sub(last_processed_tick);
        let missing_ticks =
            window.saturating_sub(replayed_history as u64 + pending_in_window as u64);

        *local = state;
        let correction_error = predicted_x - local.x;
        let pruned = batcher.prune_history_before(last_processed_tick);

        self.track_gaps(history_gap, last_processed_tick, missing_ticks, correction_error);

        debug!(
            "Reconciled at tick {}: replayed {}+{} input(s), correction {:.2}",
            last_processed_tick, replayed_history, replayed_pending, correction_error
        );

        ReconcileOutcome {
            last_processed_tick,
            replay_skipped: false,
            replayed_history,
            replayed_pending,
            missing_ticks,
            history_gap,
            correction_error,
            pruned,
        }
    }

    fn track_gaps(&mut self, history_gap: bool, tick: Tick, missing: u64, error: f32) {
        if !history_gap {
            self.gap_streak = 0;
            return;
        }

        self.gap_streak += 1;
        if self.gap_streak == self.divergence_streak {
            error!(
                "Prediction diverging: {} consecutive acknowledgements without local input (tick {}, correction {:.2})",
                self.gap_streak, tick, error
            );
        } else {
            warn!(
                "No recorded input for acknowledged tick {} ({} tick(s) missing in replay window)",
                tick, missing
            );
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new(5)
    }
}
