//! Seeded input script standing in for a keyboard when running headless.

use crate::input::{Action, InputEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Wanders left and right with occasional jumps and attacks.
///
/// Taps are pressed on one poll and released on the next, so every press is
/// paired with a release.
pub struct ScriptedInput {
    rng: StdRng,
    held: Option<Action>,
    tapped: Vec<Action>,
    next_change_at: f64,
}

impl ScriptedInput {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            held: None,
            tapped: Vec::new(),
            next_change_at: 0.0,
        }
    }

    /// Input events for the frame starting at `now_ms`.
    pub fn poll(&mut self, now_ms: f64) -> Vec<InputEvent> {
        let mut events: Vec<InputEvent> =
            self.tapped.drain(..).map(InputEvent::Released).collect();

        if now_ms >= self.next_change_at {
            if let Some(action) = self.held.take() {
                events.push(InputEvent::Released(action));
            }
            self.held = match self.rng.gen_range(0..3) {
                0 => None,
                1 => Some(Action::Left),
                _ => Some(Action::Right),
            };
            if let Some(action) = self.held {
                events.push(InputEvent::Pressed(action));
            }
            self.next_change_at = now_ms + self.rng.gen_range(200.0..800.0);
        }

        if self.rng.gen_bool(0.02) {
            self.tap(Action::Jump, &mut events);
        }
        if self.rng.gen_bool(0.03) {
            if self.rng.gen_bool(0.3) {
                self.tap(Action::Crouch, &mut events);
            }
            let limb = if self.rng.gen_bool(0.5) {
                Action::Punch
            } else {
                Action::Kick
            };
            self.tap(limb, &mut events);
        }
        events
    }

    fn tap(&mut self, action: Action, events: &mut Vec<InputEvent>) {
        events.push(InputEvent::Pressed(action));
        self.tapped.push(action);
    }

    /// Releases everything still held.
    pub fn release_all(&mut self) -> Vec<InputEvent> {
        let mut events: Vec<InputEvent> =
            self.tapped.drain(..).map(InputEvent::Released).collect();
        events.extend(self.held.take().map(InputEvent::Released));
        events
    }
}
