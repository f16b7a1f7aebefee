//! Spreads a reconciliation correction over several frames.

/// Tracks a rendered-position offset that decays toward the simulated position.
///
/// The rendered x is the simulated x plus [`CorrectionSmoother::offset`].
/// Each frame removes `floor(|offset| / divisor)` whole units. Once that
/// floors to zero the offset is below `divisor` units (up to 2.99 with the
/// default of 3), and that residual is removed in a single frame, so a small
/// correction snaps instead of crawling and the offset always reaches zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionSmoother {
    target: f32,
    applied: f32,
    divisor: f32,
}

impl CorrectionSmoother {
    pub fn new(divisor: f32) -> Self {
        Self {
            target: 0.0,
            applied: 0.0,
            divisor: divisor.max(1.0),
        }
    }

    /// Starts smoothing a new error; whatever was still outstanding carries over.
    pub fn begin(&mut self, error: f32) {
        if !error.is_finite() {
            return;
        }
        self.target = self.offset() + error;
        self.applied = 0.0;
    }

    /// Correction still to be applied.
    pub fn offset(&self) -> f32 {
        self.target - self.applied
    }

    pub fn is_active(&self) -> bool {
        self.offset() != 0.0
    }

    /// Applies this frame's share and returns it (signed).
    pub fn step(&mut self) -> f32 {
        let remaining = self.offset();
        if remaining == 0.0 {
            return 0.0;
        }

        let mut magnitude = (remaining.abs() / self.divisor).floor();
        if magnitude == 0.0 {
            magnitude = remaining.abs();
        }
        let delta = magnitude.copysign(remaining);
        self.applied += delta;

        if self.applied.abs() >= self.target.abs() {
            self.reset();
        }
        delta
    }

    pub fn reset(&mut self) {
        self.target = 0.0;
        self.applied = 0.0;
    }
}

impl Default for CorrectionSmoother {
    fn default() -> Self {
        Self::new(3.0)
    }
}
