//! Smooth display of remote players between sparse server broadcasts.

use crate::registry::{merge_authoritative, PlayerEntry};
use log::trace;
use shared::protocol::PlayerSnapshot;

/// The blend between the last displayed position and the newest target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationSample {
    pub prev_x: f32,
    pub prev_height: f32,
    pub target_x: f32,
    pub target_height: f32,
    pub snapshot_received_at: f64,
}

impl InterpolationSample {
    /// Blend factor for `now_ms`, clamped to `[0, 1]` so a stalled stream
    /// holds the latest target instead of extrapolating past it.
    pub fn factor(&self, now_ms: f64, interval_ms: f64) -> f32 {
        if interval_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.snapshot_received_at) / interval_ms).clamp(0.0, 1.0) as f32
    }

    pub fn position(&self, now_ms: f64, interval_ms: f64) -> (f32, f32) {
        let t = self.factor(now_ms, interval_ms);
        (
            self.prev_x + (self.target_x - self.prev_x) * t,
            self.prev_height + (self.target_height - self.prev_height) * t,
        )
    }
}

#[derive(Debug, Clone)]
pub struct RemoteInterpolator {
    snapshot_interval_ms: f64,
}

impl RemoteInterpolator {
    pub fn new(snapshot_interval_ms: f64) -> Self {
        Self {
            snapshot_interval_ms,
        }
    }

    pub fn snapshot_interval_ms(&self) -> f64 {
        self.snapshot_interval_ms
    }

    pub fn set_snapshot_interval_ms(&mut self, interval_ms: f64) {
        self.snapshot_interval_ms = interval_ms;
    }

    /// Starts a new blend from the currently displayed position to `snapshot`.
    pub fn on_snapshot(&self, entry: &mut PlayerEntry, snapshot: &PlayerSnapshot, now_ms: f64) {
        merge_authoritative(&mut entry.state, snapshot);

        // Receipt stamps never run backwards.
        let received_at = match entry.interpolation {
            Some(previous) => now_ms.max(previous.snapshot_received_at),
            None => now_ms,
        };
        entry.interpolation = Some(InterpolationSample {
            prev_x: entry.render.x,
            prev_height: entry.render.height,
            target_x: snapshot.x,
            target_height: snapshot.height,
            snapshot_received_at: received_at,
        });
        trace!(
            "Player {} interpolating {:.1} -> {:.1}",
            snapshot.id,
            entry.render.x,
            snapshot.x
        );
    }

    /// Moves the displayed position along the current blend.
    pub fn advance(&self, entry: &mut PlayerEntry, now_ms: f64) {
        if let Some(sample) = entry.interpolation {
            let (x, height) = sample.position(now_ms, self.snapshot_interval_ms);
            entry.render.x = x;
            entry.render.height = height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{CharacterStats, PlayerState};

    fn snapshot_at(x: f32, height: f32) -> PlayerSnapshot {
        let mut state = PlayerState::new(2, x, CharacterStats::default());
        state.height = height;
        PlayerSnapshot::from_state(&state, None)
    }

    #[test]
    fn test_halfway_between_snapshots() {
        let sample = InterpolationSample {
            prev_x: 0.0,
            prev_height: 0.0,
            target_x: 100.0,
            target_height: 40.0,
            snapshot_received_at: 1000.0,
        };
        let (x, height) = sample.position(1025.0, 50.0);
        assert_approx_eq!(x, 50.0);
        assert_approx_eq!(height, 20.0);
    }

    #[test]
    fn test_factor_is_clamped() {
        let sample = InterpolationSample {
            prev_x: 0.0,
            prev_height: 0.0,
            target_x: 100.0,
            target_height: 0.0,
            snapshot_received_at: 1000.0,
        };
        for now in [0.0, 999.0, 1000.0, 1010.0, 1050.0, 5000.0] {
            let t = sample.factor(now, 50.0);
            assert!((0.0..=1.0).contains(&t));
        }
        assert_eq!(sample.position(5000.0, 50.0).0, 100.0);
        assert_eq!(sample.position(900.0, 50.0).0, 0.0);
        assert_eq!(sample.factor(1000.0, 0.0), 1.0);
    }

    #[test]
    fn test_new_snapshot_starts_from_displayed_position() {
        let interpolator = RemoteInterpolator::new(50.0);
        let mut entry = PlayerEntry::from_snapshot(&snapshot_at(0.0, 0.0));

        interpolator.on_snapshot(&mut entry, &snapshot_at(100.0, 0.0), 0.0);
        interpolator.advance(&mut entry, 25.0);
        assert_approx_eq!(entry.render.x, 50.0);
        assert_eq!(entry.state.x, 100.0);

        interpolator.on_snapshot(&mut entry, &snapshot_at(200.0, 0.0), 25.0);
        let sample = entry.interpolation.unwrap();
        assert_approx_eq!(sample.prev_x, 50.0);
        assert_eq!(sample.target_x, 200.0);

        interpolator.advance(&mut entry, 75.0);
        assert_approx_eq!(entry.render.x, 200.0);
    }

    #[test]
    fn test_receive_time_is_monotonic() {
        let interpolator = RemoteInterpolator::new(50.0);
        let mut entry = PlayerEntry::from_snapshot(&snapshot_at(0.0, 0.0));
        interpolator.on_snapshot(&mut entry, &snapshot_at(10.0, 0.0), 500.0);
        interpolator.on_snapshot(&mut entry, &snapshot_at(20.0, 0.0), 400.0);
        assert_eq!(entry.interpolation.unwrap().snapshot_received_at, 500.0);
    }

    #[test]
    fn test_entry_without_sample_is_untouched() {
        let interpolator = RemoteInterpolator::new(50.0);
        let mut entry = PlayerEntry::from_snapshot(&snapshot_at(42.0, 0.0));
        interpolator.advance(&mut entry, 1000.0);
        assert_eq!(entry.render.x, 42.0);
    }
}
