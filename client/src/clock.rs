//! Mapping from local wall-clock time to the server's tick counter.

use log::info;
use shared::Tick;
use std::time::Instant;

/// Monotonic local time in milliseconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    origin: Instant,
}

impl LocalClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickAnchor {
    pub local_receive_time_ms: f64,
    pub server_tick_at_receipt: Tick,
    pub tick_rate_hz: u32,
    pub one_way_delay_ms: f64,
}

/// Estimates the current server tick from a per-round anchor.
///
/// Every round is anchored fresh; nothing is smoothed across anchors, so
/// drift is bounded by the accuracy of the delay estimate at anchor time.
#[derive(Debug, Clone, Default)]
pub struct TickClock {
    anchor: Option<TickAnchor>,
}

impl TickClock {
    /// Returned before anchoring; dependents must not send or replay on it.
    pub const NOT_STARTED: Tick = 0;

    pub fn new() -> Self {
        Self { anchor: None }
    }

    pub fn anchor(
        &mut self,
        server_tick: Tick,
        tick_rate_hz: u32,
        one_way_delay_ms: f64,
        at_local_time_ms: f64,
    ) {
        let one_way_delay_ms = if one_way_delay_ms.is_finite() {
            one_way_delay_ms.max(0.0)
        } else {
            0.0
        };
        let anchor = TickAnchor {
            local_receive_time_ms: at_local_time_ms,
            server_tick_at_receipt: server_tick,
            tick_rate_hz: tick_rate_hz.max(1),
            one_way_delay_ms,
        };
        info!(
            "Tick clock anchored at server tick {} ({}Hz, one-way delay {:.1}ms)",
            server_tick, anchor.tick_rate_hz, one_way_delay_ms
        );
        self.anchor = Some(anchor);
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn current_anchor(&self) -> Option<&TickAnchor> {
        self.anchor.as_ref()
    }

    pub fn tick_rate_hz(&self) -> Option<u32> {
        self.anchor.map(|anchor| anchor.tick_rate_hz)
    }

    pub fn estimate_current_tick(&self, now_ms: f64) -> Tick {
        let Some(anchor) = self.anchor else {
            return Self::NOT_STARTED;
        };
        let elapsed_ms =
            (now_ms - anchor.local_receive_time_ms + anchor.one_way_delay_ms).max(0.0);
        // Multiply before dividing so exact tick boundaries don't round down.
        let ticks = (elapsed_ms * anchor.tick_rate_hz as f64 / 1000.0).floor();
        anchor.server_tick_at_receipt + ticks as Tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_started_before_anchor() {
        let clock = TickClock::new();
        assert!(!clock.is_anchored());
        assert_eq!(clock.estimate_current_tick(12345.0), TickClock::NOT_STARTED);
    }

    #[test]
    fn test_estimate_after_anchor() {
        let mut clock = TickClock::new();
        let t = 5000.0;
        clock.anchor(1000, 60, 20.0, t);
        assert_eq!(clock.estimate_current_tick(t + 100.0), 1007);
        assert_eq!(clock.estimate_current_tick(t), 1001);
    }

    #[test]
    fn test_exact_tick_boundary() {
        let mut clock = TickClock::new();
        clock.anchor(0, 60, 0.0, 0.0);
        assert_eq!(clock.estimate_current_tick(50.0), 3);
        assert_eq!(clock.estimate_current_tick(1000.0), 60);
    }

    #[test]
    fn test_time_before_anchor_does_not_go_backwards() {
        let mut clock = TickClock::new();
        clock.anchor(500, 60, 0.0, 1000.0);
        assert_eq!(clock.estimate_current_tick(900.0), 500);
    }

    #[test]
    fn test_reanchor_discards_previous_round() {
        let mut clock = TickClock::new();
        clock.anchor(1000, 60, 50.0, 0.0);
        clock.anchor(4000, 30, 0.0, 10_000.0);
        assert_eq!(clock.tick_rate_hz(), Some(30));
        assert_eq!(clock.estimate_current_tick(11_000.0), 4030);

        clock.reset();
        assert_eq!(clock.estimate_current_tick(11_000.0), TickClock::NOT_STARTED);
    }

    #[test]
    fn test_invalid_delay_is_treated_as_zero() {
        let mut clock = TickClock::new();
        clock.anchor(10, 60, f64::NAN, 0.0);
        assert_eq!(clock.current_anchor().unwrap().one_way_delay_ms, 0.0);
        clock.anchor(10, 60, -30.0, 0.0);
        assert_eq!(clock.estimate_current_tick(0.0), 10);
    }

    #[test]
    fn test_local_clock_is_monotonic() {
        let clock = LocalClock::new();
        let first = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(clock.now_ms() > first);
    }
}
