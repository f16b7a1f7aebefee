//! The single-tick movement step shared with the authoritative server.
//!
//! Client replay only converges if this is exactly the server's step, so it
//! is kept pure: the same state and input always produce the same result.

use crate::input::InputFlags;
use crate::player::{ActiveAttack, Facing, PlayerState};
use crate::{CANVAS_WIDTH, GRAVITY, SERVER_TICK_RATE};

/// Advances `state` by one simulation tick under `input`.
///
/// Order of rules:
/// 1. jump starts only from the ground;
/// 2. horizontal velocity is set (not blended) while grounded at the start of
///    the tick, so the take-off tick still carries ground control;
/// 3. crouch is a body-shape flag and never touches velocity;
/// 4. the active attack counts down, or a new one starts when none is active;
/// 5. x integrates velocity and height drops by vertical velocity; gravity and
///    the landing clamp only apply to a player already airborne before the
///    tick, so the take-off tick keeps the full jump velocity;
/// 6. x is clamped to `[0, CANVAS_WIDTH - width]`.
pub fn advance(state: &PlayerState, input: &InputFlags) -> PlayerState {
    let mut next = state.clone();
    let stats = &state.stats;
    let grounded = state.is_grounded();

    if input.jump && grounded {
        next.vel_y = stats.jump_velocity;
        next.is_jumping = true;
    }

    if grounded {
        next.vel_x = match (input.left, input.right) {
            (true, false) => -stats.movement_speed,
            (false, true) => stats.movement_speed,
            _ => 0.0,
        };
        if input.left != input.right {
            next.facing = if input.left { Facing::Left } else { Facing::Right };
        }
        next.is_crouching = input.crouch;
    }

    next.attack = match state.attack {
        Some(active) if active.remaining_ticks > 1 => Some(ActiveAttack {
            remaining_ticks: active.remaining_ticks - 1,
            ..active
        }),
        Some(_) => None,
        None => input.attack.map(|kind| ActiveAttack {
            kind,
            remaining_ticks: stats.combat.duration_ticks(kind, SERVER_TICK_RATE),
        }),
    };

    next.x += next.vel_x;

    if next.is_jumping {
        next.height -= next.vel_y;
    }
    if state.is_jumping {
        if next.height <= 0.0 {
            next.height = 0.0;
            next.vel_y = 0.0;
            next.is_jumping = false;
        } else {
            next.vel_y += GRAVITY;
        }
    }

    next.x = next.x.clamp(0.0, CANVAS_WIDTH - stats.width);

    next
}

/// Folds [`advance`] over a sequence of inputs.
pub fn simulate<'a, I>(state: &PlayerState, inputs: I) -> PlayerState
where
    I: IntoIterator<Item = &'a InputFlags>,
{
    inputs
        .into_iter()
        .fold(state.clone(), |current, input| advance(&current, input))
}
