//! Input capture: raw key events to semantic actions and directional attacks

use log::{debug, trace};
use shared::{AttackHeight, AttackType, CombatData, InputFlags, Limb};

/// Semantic actions the fighter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Jump,
    Crouch,
    Punch,
    Kick,
}

impl Action {
    /// Maps browser-style `KeyboardEvent.code` values to actions.
    pub fn from_key_code(code: &str) -> Option<Self> {
        match code {
            "ArrowLeft" | "KeyA" => Some(Action::Left),
            "ArrowRight" | "KeyD" => Some(Action::Right),
            "ArrowUp" | "KeyW" | "Space" => Some(Action::Jump),
            "ArrowDown" | "KeyS" => Some(Action::Crouch),
            "KeyP" | "KeyJ" => Some(Action::Punch),
            "KeyK" => Some(Action::Kick),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Pressed(Action),
    Released(Action),
}

#[derive(Debug, Clone, Copy)]
struct PendingAttack {
    kind: AttackType,
    expires_at_ms: f64,
}

/// Held movement actions plus a single attack slot with an explicit expiry.
///
/// An attack press is ignored while another attack is active: no queuing and
/// no interrupting, so animations cannot be cancelled into each other.
#[derive(Debug, Clone)]
pub struct InputCapture {
    left: bool,
    right: bool,
    jump: bool,
    crouch: bool,
    attack: Option<PendingAttack>,
    combat: CombatData,
    ignored_attacks: u64,
}

impl InputCapture {
    pub fn new(combat: CombatData) -> Self {
        Self {
            left: false,
            right: false,
            jump: false,
            crouch: false,
            attack: None,
            combat,
            ignored_attacks: 0,
        }
    }

    /// Replaces the attack timings, e.g. once the server announces the character.
    pub fn set_combat(&mut self, combat: CombatData) {
        self.combat = combat;
    }

    pub fn handle(&mut self, event: InputEvent, now_ms: f64) {
        match event {
            InputEvent::Pressed(action) => {
                self.press(action, now_ms);
            }
            InputEvent::Released(action) => self.release(action),
        }
    }

    /// Returns the attack started by this press, if any.
    pub fn press(&mut self, action: Action, now_ms: f64) -> Option<AttackType> {
        self.expire(now_ms);
        match action {
            Action::Left => self.left = true,
            Action::Right => self.right = true,
            Action::Jump => self.jump = true,
            Action::Crouch => self.crouch = true,
            Action::Punch => return self.start_attack(Limb::Punch, now_ms),
            Action::Kick => return self.start_attack(Limb::Kick, now_ms),
        }
        None
    }

    /// Attack releases are no-ops; attacks end on their own expiry.
    pub fn release(&mut self, action: Action) {
        match action {
            Action::Left => self.left = false,
            Action::Right => self.right = false,
            Action::Jump => self.jump = false,
            Action::Crouch => self.crouch = false,
            Action::Punch | Action::Kick => {}
        }
    }

    fn start_attack(&mut self, limb: Limb, now_ms: f64) -> Option<AttackType> {
        if let Some(active) = self.attack {
            self.ignored_attacks += 1;
            trace!("Ignoring {:?} while {:?} is active", limb, active.kind);
            return None;
        }

        let height = if self.jump {
            AttackHeight::High
        } else if self.crouch {
            AttackHeight::Low
        } else {
            AttackHeight::Mid
        };
        let kind = AttackType::new(height, limb);
        let duration = self.combat.duration_ms(kind) as f64;
        self.attack = Some(PendingAttack {
            kind,
            expires_at_ms: now_ms + duration,
        });
        debug!("Attack {:?} for {}ms", kind, duration);
        Some(kind)
    }

    pub fn expire(&mut self, now_ms: f64) {
        if let Some(active) = self.attack {
            if now_ms >= active.expires_at_ms {
                self.attack = None;
            }
        }
    }

    pub fn active_attack(&self) -> Option<AttackType> {
        self.attack.map(|active| active.kind)
    }

    /// Builds this frame's flag record after clearing any expired attack.
    pub fn flags(&mut self, now_ms: f64) -> InputFlags {
        self.expire(now_ms);
        InputFlags {
            left: self.left,
            right: self.right,
            jump: self.jump,
            crouch: self.crouch,
            attack: self.active_attack(),
        }
    }

    /// Drops every held action and the active attack.
    pub fn clear(&mut self) {
        *self = Self {
            combat: self.combat,
            ignored_attacks: self.ignored_attacks,
            ..Self::new(self.combat)
        };
    }

    pub fn ignored_attacks(&self) -> u64 {
        self.ignored_attacks
    }
}

impl Default for InputCapture {
    fn default() -> Self {
        Self::new(CombatData::default())
    }
}
