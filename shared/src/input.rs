use serde::{Deserialize, Serialize};

use crate::player::{AttackType, Tick};

const LEFT_BIT: u16 = 1 << 0;
const RIGHT_BIT: u16 = 1 << 1;
const JUMP_BIT: u16 = 1 << 2;
const CROUCH_BIT: u16 = 1 << 3;
const ATTACK_SHIFT: u16 = 4;
const ATTACK_MASK: u16 = 0b111 << ATTACK_SHIFT;
const KNOWN_BITS: u16 = LEFT_BIT | RIGHT_BIT | JUMP_BIT | CROUCH_BIT | ATTACK_MASK;

/// The semantic action set active during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputFlags {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub crouch: bool,
    pub attack: Option<AttackType>,
}

impl InputFlags {
    /// Packs the flags into the compact integer carried on the wire.
    ///
    /// Bits 0-3 hold left, right, jump and crouch; bits 4-6 hold the attack
    /// code (0 for none, 1-6 in [`AttackType::ALL`] order).
    pub fn to_bits(&self) -> u16 {
        let mut bits = 0;
        if self.left {
            bits |= LEFT_BIT;
        }
        if self.right {
            bits |= RIGHT_BIT;
        }
        if self.jump {
            bits |= JUMP_BIT;
        }
        if self.crouch {
            bits |= CROUCH_BIT;
        }
        if let Some(attack) = self.attack {
            bits |= ((attack.index() as u16) + 1) << ATTACK_SHIFT;
        }
        bits
    }

    /// Returns `None` for reserved bits or an attack code outside 0-6.
    pub fn from_bits(bits: u16) -> Option<Self> {
        if bits & !KNOWN_BITS != 0 {
            return None;
        }
        let attack = match (bits & ATTACK_MASK) >> ATTACK_SHIFT {
            0 => None,
            code @ 1..=6 => Some(AttackType::ALL[code as usize - 1]),
            _ => return None,
        };
        Some(Self {
            left: bits & LEFT_BIT != 0,
            right: bits & RIGHT_BIT != 0,
            jump: bits & JUMP_BIT != 0,
            crouch: bits & CROUCH_BIT != 0,
            attack,
        })
    }
}

/// Input for one frame, tagged with the server tick it is meant for.
///
/// `tick` stays `None` until the tick clock has been anchored; the batcher
/// fills it in at flush time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub tick: Option<Tick>,
    pub frame: Option<u64>,
    pub flags: InputFlags,
}

impl InputSnapshot {
    pub fn new(flags: InputFlags, tick: Option<Tick>, frame: u64) -> Self {
        Self {
            tick,
            frame: Some(frame),
            flags,
        }
    }
}
