//! The session-owned player registry.

use crate::interpolation::InterpolationSample;
use log::{info, warn};
use shared::protocol::PlayerSnapshot;
use shared::{PlayerId, PlayerState};
use std::collections::HashMap;

/// Locally owned display position; never sent or overwritten by the server.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderState {
    pub x: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct PlayerEntry {
    /// Simulation fields; the server is authoritative for all of them.
    pub state: PlayerState,
    pub render: RenderState,
    /// Present for remote players once their first broadcast has arrived.
    pub interpolation: Option<InterpolationSample>,
}

impl PlayerEntry {
    pub fn from_snapshot(snapshot: &PlayerSnapshot) -> Self {
        let state = snapshot.to_state();
        Self {
            render: RenderState {
                x: state.x,
                height: state.height,
            },
            state,
            interpolation: None,
        }
    }
}

/// Copies every server-authoritative field of `snapshot` into `state`.
///
/// `PlayerState` holds only simulation fields, so nothing in it is locally
/// owned; display state lives in [`RenderState`] and is left alone. The
/// identity is kept as-is.
pub fn merge_authoritative(state: &mut PlayerState, snapshot: &PlayerSnapshot) {
    state.x = snapshot.x;
    state.height = snapshot.height;
    state.vel_x = snapshot.vel_x;
    state.vel_y = snapshot.vel_y;
    state.facing = snapshot.facing;
    state.is_jumping = snapshot.is_jumping;
    state.is_crouching = snapshot.is_crouching;
    state.attack = snapshot.attack;
    state.health = snapshot.health;
    state.max_health = snapshot.max_health;
    state.stats = snapshot.stats;
}

/// Players in the current room, keyed by id.
///
/// Entries are only created and removed through [`PlayerRegistry::join`] and
/// [`PlayerRegistry::leave`]; everything else mutates existing entries.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, PlayerEntry>,
    local_id: Option<PlayerId>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local_id(&mut self, id: PlayerId) {
        self.local_id = Some(id);
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn is_local(&self, id: PlayerId) -> bool {
        self.local_id == Some(id)
    }

    pub fn join(&mut self, snapshot: &PlayerSnapshot) {
        if self.players.contains_key(&snapshot.id) {
            warn!("Player {} joined twice, replacing entry", snapshot.id);
        } else {
            info!("Player {} joined at x={:.1}", snapshot.id, snapshot.x);
        }
        self.players
            .insert(snapshot.id, PlayerEntry::from_snapshot(snapshot));
    }

    pub fn leave(&mut self, id: PlayerId) -> Option<PlayerEntry> {
        let removed = self.players.remove(&id);
        if removed.is_some() {
            info!("Player {} left", id);
        }
        removed
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerEntry> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerEntry> {
        self.players.get_mut(&id)
    }

    pub fn local(&self) -> Option<&PlayerEntry> {
        self.local_id.and_then(|id| self.players.get(&id))
    }

    pub fn local_mut(&mut self) -> Option<&mut PlayerEntry> {
        let id = self.local_id?;
        self.players.get_mut(&id)
    }

    pub fn remotes_mut(&mut self) -> impl Iterator<Item = &mut PlayerEntry> + '_ {
        let local_id = self.local_id;
        self.players
            .iter_mut()
            .filter(move |(id, _)| Some(**id) != local_id)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &PlayerEntry)> + '_ {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }
}
