use serde::{Deserialize, Serialize};

use crate::{
    ARM_HEIGHT, ARM_WIDTH, FLOOR_Y, JUMP_VELOCITY, LEG_HEIGHT, LEG_WIDTH, MAX_HEALTH,
    MOVEMENT_SPEED, PLAYER_HEIGHT, PLAYER_WIDTH,
};

pub type PlayerId = u32;

/// One authoritative simulation step on the server.
pub type Tick = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackHeight {
    High,
    Mid,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Limb {
    Punch,
    Kick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    HighPunch,
    MidPunch,
    LowPunch,
    HighKick,
    MidKick,
    LowKick,
}

impl AttackType {
    pub const ALL: [AttackType; 6] = [
        AttackType::HighPunch,
        AttackType::MidPunch,
        AttackType::LowPunch,
        AttackType::HighKick,
        AttackType::MidKick,
        AttackType::LowKick,
    ];

    pub fn new(height: AttackHeight, limb: Limb) -> Self {
        match (height, limb) {
            (AttackHeight::High, Limb::Punch) => AttackType::HighPunch,
            (AttackHeight::Mid, Limb::Punch) => AttackType::MidPunch,
            (AttackHeight::Low, Limb::Punch) => AttackType::LowPunch,
            (AttackHeight::High, Limb::Kick) => AttackType::HighKick,
            (AttackHeight::Mid, Limb::Kick) => AttackType::MidKick,
            (AttackHeight::Low, Limb::Kick) => AttackType::LowKick,
        }
    }

    pub fn height(self) -> AttackHeight {
        match self {
            AttackType::HighPunch | AttackType::HighKick => AttackHeight::High,
            AttackType::MidPunch | AttackType::MidKick => AttackHeight::Mid,
            AttackType::LowPunch | AttackType::LowKick => AttackHeight::Low,
        }
    }

    pub fn limb(self) -> Limb {
        match self {
            AttackType::HighPunch | AttackType::MidPunch | AttackType::LowPunch => Limb::Punch,
            AttackType::HighKick | AttackType::MidKick | AttackType::LowKick => Limb::Kick,
        }
    }

    /// Position in [`AttackType::ALL`], also used as the table index in [`CombatData`].
    pub fn index(self) -> usize {
        match self {
            AttackType::HighPunch => 0,
            AttackType::MidPunch => 1,
            AttackType::LowPunch => 2,
            AttackType::HighKick => 3,
            AttackType::MidKick => 4,
            AttackType::LowKick => 5,
        }
    }
}

/// Per-character attack durations in milliseconds, indexed by [`AttackType::index`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatData {
    pub durations_ms: [u32; 6],
}

impl CombatData {
    pub fn duration_ms(&self, attack: AttackType) -> u32 {
        self.durations_ms[attack.index()]
    }

    /// Duration rounded up to whole ticks, never shorter than one tick.
    pub fn duration_ticks(&self, attack: AttackType, tick_rate_hz: u32) -> u32 {
        let ms = self.duration_ms(attack) as u64;
        let ticks = (ms * tick_rate_hz as u64 + 999) / 1000;
        ticks.max(1) as u32
    }
}

impl Default for CombatData {
    fn default() -> Self {
        Self {
            durations_ms: [250, 300, 350, 400, 400, 450],
        }
    }
}

/// Character tunables supplied by the server; immutable for the match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub movement_speed: f32,
    pub jump_velocity: f32,
    pub width: f32,
    pub height: f32,
    pub combat: CombatData,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self {
            movement_speed: MOVEMENT_SPEED,
            jump_velocity: JUMP_VELOCITY,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            combat: CombatData::default(),
        }
    }
}

/// An attack in progress, expiring after `remaining_ticks` more simulation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAttack {
    pub kind: AttackType,
    pub remaining_ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    /// Left edge in world units.
    pub x: f32,
    /// Height above the floor; zero when grounded.
    pub height: f32,
    pub vel_x: f32,
    /// Negative while rising.
    pub vel_y: f32,
    pub facing: Facing,
    pub is_jumping: bool,
    pub is_crouching: bool,
    pub attack: Option<ActiveAttack>,
    pub health: f32,
    pub max_health: f32,
    pub stats: CharacterStats,
}

impl PlayerState {
    pub fn new(id: PlayerId, x: f32, stats: CharacterStats) -> Self {
        Self {
            id,
            x,
            height: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            facing: Facing::Right,
            is_jumping: false,
            is_crouching: false,
            attack: None,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            stats,
        }
    }

    pub fn is_grounded(&self) -> bool {
        !self.is_jumping
    }

    pub fn body_box(&self) -> Hitbox {
        let body_height = if self.is_crouching {
            self.stats.height / 2.0
        } else {
            self.stats.height
        };
        Hitbox {
            x: self.x,
            y: FLOOR_Y - body_height - self.height,
            width: self.stats.width,
            height: body_height,
        }
    }

    /// Reach of the active attack, extended from the side the player faces.
    pub fn attack_box(&self) -> Option<Hitbox> {
        let attack = self.attack?;
        let body = self.body_box();
        let (width, height) = match attack.kind.limb() {
            Limb::Punch => (ARM_WIDTH, ARM_HEIGHT),
            Limb::Kick => (LEG_WIDTH, LEG_HEIGHT),
        };
        let x = match self.facing {
            Facing::Right => body.x + body.width,
            Facing::Left => body.x - width,
        };
        let y = match attack.kind.height() {
            AttackHeight::High => body.y + body.height * 0.1,
            AttackHeight::Mid => body.y + body.height * 0.45 - height / 2.0,
            AttackHeight::Low => body.y + body.height * 0.9 - height,
        };
        Some(Hitbox {
            x,
            y,
            width,
            height,
        })
    }
}

/// Axis-aligned box in canvas coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Hitbox {
    pub fn overlaps(&self, other: &Hitbox) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}
