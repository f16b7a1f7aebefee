//! Per-frame input buffering, batched flushes and the tick-keyed replay history.

use crate::clock::TickClock;
use log::{debug, trace};
use shared::protocol::{InputBatch, WireInput};
use shared::{InputFlags, InputSnapshot, Tick};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included};

/// Flushed inputs keyed by server tick, kept until the server acknowledges them.
#[derive(Debug, Clone, Default)]
pub struct InputHistory {
    entries: BTreeMap<Tick, InputSnapshot>,
}

impl InputHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last writer wins for a repeated tick. Untagged snapshots are rejected.
    pub fn insert(&mut self, snapshot: InputSnapshot) -> bool {
        match snapshot.tick {
            Some(tick) => {
                self.entries.insert(tick, snapshot);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, tick: Tick) -> Option<&InputSnapshot> {
        self.entries.get(&tick)
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.entries.contains_key(&tick)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.entries.keys().copied()
    }

    /// Entries with `after < tick <= up_to`, in ascending tick order.
    pub fn range(&self, after: Tick, up_to: Tick) -> impl Iterator<Item = &InputSnapshot> + '_ {
        let end = up_to.max(after);
        self.entries
            .range((Excluded(after), Included(end)))
            .map(|(_, snapshot)| snapshot)
    }

    /// Removes every entry strictly older than `tick`; returns how many went.
    pub fn prune_before(&mut self, tick: Tick) -> usize {
        let before = self.entries.len();
        self.entries = self.entries.split_off(&tick);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Buffers one snapshot per frame and flushes them as a batch every N frames.
#[derive(Debug, Clone)]
pub struct InputBatcher {
    pending: Vec<InputSnapshot>,
    history: InputHistory,
    frames_per_batch: u32,
    last_flush_frame: u64,
    batches_sent: u64,
}

impl InputBatcher {
    pub fn new(frames_per_batch: u32) -> Self {
        Self {
            pending: Vec::new(),
            history: InputHistory::new(),
            frames_per_batch: frames_per_batch.max(1),
            last_flush_frame: 0,
            batches_sent: 0,
        }
    }

    /// Buffers this frame's input, tagged with the estimated tick once anchored.
    pub fn record(
        &mut self,
        flags: InputFlags,
        frame: u64,
        clock: &TickClock,
        now_ms: f64,
    ) -> InputSnapshot {
        let tick = clock
            .is_anchored()
            .then(|| clock.estimate_current_tick(now_ms));
        let snapshot = InputSnapshot::new(flags, tick, frame);
        self.pending.push(snapshot);
        snapshot
    }

    /// True every `frames_per_batch` frames; marks the cadence as consumed.
    pub fn take_flush_slot(&mut self, frame: u64) -> bool {
        if frame.saturating_sub(self.last_flush_frame) >= self.frames_per_batch as u64 {
            self.last_flush_frame = frame;
            true
        } else {
            false
        }
    }

    /// Drains the buffer into a network batch and copies it into the history.
    ///
    /// No-op (and `None`) while the clock is unanchored or nothing is buffered.
    pub fn flush(&mut self, clock: &TickClock, now_ms: f64) -> Option<InputBatch> {
        if !clock.is_anchored() || self.pending.is_empty() {
            return None;
        }

        let estimate = clock.estimate_current_tick(now_ms);
        let mut frames = Vec::with_capacity(self.pending.len());
        for mut snapshot in self.pending.drain(..) {
            if snapshot.tick.is_none() {
                snapshot.tick = Some(estimate);
            }
            if let Some(wire) = WireInput::from_snapshot(&snapshot) {
                frames.push(wire);
            }
            self.history.insert(snapshot);
        }

        self.batches_sent += 1;
        trace!(
            "Flushing {} frame(s), ticks {:?}",
            frames.len(),
            frames.iter().map(|f| f.t).collect::<Vec<_>>()
        );
        Some(InputBatch { frames })
    }

    pub fn prune_history_before(&mut self, tick: Tick) -> usize {
        let pruned = self.history.prune_before(tick);
        if pruned > 0 {
            debug!(
                "Pruned {} input(s) before tick {}, {} retained",
                pruned,
                tick,
                self.history.len()
            );
        }
        pruned
    }

    pub fn pending(&self) -> &[InputSnapshot] {
        &self.pending
    }

    pub fn history(&self) -> &InputHistory {
        &self.history
    }

    pub fn batches_sent(&self) -> u64 {
        self.batches_sent
    }

    /// Forgets buffered and historical input, e.g. when a new round is anchored.
    pub fn reset(&mut self, frame: u64) {
        self.pending.clear();
        self.history.clear();
        self.last_flush_frame = frame;
    }
}
