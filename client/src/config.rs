//! Tunables for the synchronization engine.

use shared::{snapshot_interval_ms, SERVER_TICK_RATE, TICKS_PER_BATCH};

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Tick rate assumed until a `matchStart` supplies the real one.
    pub tick_rate_hz: u32,
    /// Frames buffered before an input batch is flushed.
    pub frames_per_batch: u32,
    /// Server ticks between two state broadcasts.
    pub ticks_per_snapshot: u32,
    /// Round-trip samples kept for the latency mean.
    pub latency_history: usize,
    pub probe_interval_ms: f64,
    /// Outstanding probes older than this count as lost.
    pub probe_timeout_ms: f64,
    /// Fraction of the remaining correction applied per frame is `1 / smoothing_divisor`.
    pub smoothing_divisor: f32,
    /// Consecutive history gaps before divergence is reported as an error.
    pub divergence_streak: u32,
    pub frame_interval_ms: u64,
}

impl SyncConfig {
    pub fn snapshot_interval_ms(&self) -> f64 {
        snapshot_interval_ms(self.ticks_per_snapshot, self.tick_rate_hz)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: SERVER_TICK_RATE,
            frames_per_batch: TICKS_PER_BATCH,
            ticks_per_snapshot: TICKS_PER_BATCH,
            latency_history: 10,
            probe_interval_ms: 500.0,
            probe_timeout_ms: 2000.0,
            smoothing_divisor: 3.0,
            divergence_streak: 5,
            frame_interval_ms: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_default_snapshot_interval() {
        let config = SyncConfig::default();
        assert_approx_eq!(config.snapshot_interval_ms(), 50.0);
        assert_eq!(config.frames_per_batch, 3);
    }
}
