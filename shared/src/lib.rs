//! Definitions the client and the authoritative server must agree on exactly:
//! world constants, the player record, the input flag set and its bitmask,
//! the single-tick movement step and the wire protocol.

pub mod input;
pub mod physics;
pub mod player;
pub mod protocol;

pub use input::{InputFlags, InputSnapshot};
pub use physics::{advance, simulate};
pub use player::{
    ActiveAttack, AttackHeight, AttackType, CharacterStats, CombatData, Facing, Hitbox, Limb,
    PlayerId, PlayerState, Tick,
};
pub use protocol::{ClientEvent, ServerEvent};

pub const CANVAS_WIDTH: f32 = 1000.0;
pub const CANVAS_HEIGHT: f32 = 500.0;
pub const FLOOR_HEIGHT: f32 = 50.0;
pub const FLOOR_Y: f32 = CANVAS_HEIGHT - FLOOR_HEIGHT;

/// Added to vertical velocity every airborne tick (units per tick squared).
pub const GRAVITY: f32 = 0.8;

pub const SERVER_TICK_RATE: u32 = 60;
/// Ticks the server simulates between two state broadcasts.
pub const TICKS_PER_BATCH: u32 = 3;

pub const PLAYER_WIDTH: f32 = 50.0;
pub const PLAYER_HEIGHT: f32 = 100.0;
pub const MOVEMENT_SPEED: f32 = 5.0;
pub const JUMP_VELOCITY: f32 = -15.0;
pub const MAX_HEALTH: f32 = 100.0;

pub const ARM_WIDTH: f32 = 40.0;
pub const ARM_HEIGHT: f32 = 10.0;
pub const LEG_WIDTH: f32 = 55.0;
pub const LEG_HEIGHT: f32 = 14.0;

pub const CLIENT_VERSION: u32 = 1;

/// Milliseconds between two server state broadcasts.
pub fn snapshot_interval_ms(ticks_per_batch: u32, tick_rate_hz: u32) -> f64 {
    ticks_per_batch as f64 * 1000.0 / tick_rate_hz as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_snapshot_interval() {
        assert_approx_eq!(snapshot_interval_ms(TICKS_PER_BATCH, SERVER_TICK_RATE), 50.0);
        assert_approx_eq!(snapshot_interval_ms(2, 20), 100.0);
    }

    #[test]
    fn test_floor_is_above_canvas_bottom() {
        assert!(FLOOR_Y < CANVAS_HEIGHT);
        assert!(FLOOR_Y - PLAYER_HEIGHT > 0.0);
    }
}
