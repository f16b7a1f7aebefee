//! Socket-style event protocol between client and server.
//!
//! Events are externally tagged, so the JSON form carries the event name as
//! the outer key (`{"ib":{"b":[...]}}`) and the same types travel over the
//! datagram transport through `bincode`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::input::{InputFlags, InputSnapshot};
use crate::player::{ActiveAttack, CharacterStats, Facing, PlayerId, PlayerState, Tick};

/// One buffered frame inside an `ib` batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireInput {
    /// Estimated server tick.
    pub t: Tick,
    /// Local frame counter, diagnostic only.
    pub f: Option<u64>,
    /// [`InputFlags::to_bits`] bitmask.
    pub k: u16,
}

impl WireInput {
    /// `None` when the snapshot has not been tagged with a tick yet.
    pub fn from_snapshot(snapshot: &InputSnapshot) -> Option<Self> {
        Some(Self {
            t: snapshot.tick?,
            f: snapshot.frame,
            k: snapshot.flags.to_bits(),
        })
    }

    pub fn to_snapshot(&self) -> Option<InputSnapshot> {
        Some(InputSnapshot {
            tick: Some(self.t),
            frame: self.f,
            flags: InputFlags::from_bits(self.k)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBatch {
    #[serde(rename = "b")]
    pub frames: Vec<WireInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStart {
    pub server_tick: Tick,
    pub server_time_ms: u64,
    pub tick_rate: u32,
    pub match_start_tick: Tick,
}

/// A server-originated latency probe; the client echoes it back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyProbe {
    pub seq: u32,
    pub server_sent_at: f64,
}

/// Authoritative state for one player within a `gs` broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub x: f32,
    pub height: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub facing: Facing,
    pub is_jumping: bool,
    pub is_crouching: bool,
    pub attack: Option<ActiveAttack>,
    pub health: f32,
    pub max_health: f32,
    pub stats: CharacterStats,
    /// Highest input tick consumed before this state was produced; only set
    /// on the receiving client's own entry.
    pub last_processed_tick: Option<Tick>,
}

impl PlayerSnapshot {
    pub fn from_state(state: &PlayerState, last_processed_tick: Option<Tick>) -> Self {
        Self {
            id: state.id,
            x: state.x,
            height: state.height,
            vel_x: state.vel_x,
            vel_y: state.vel_y,
            facing: state.facing,
            is_jumping: state.is_jumping,
            is_crouching: state.is_crouching,
            attack: state.attack,
            health: state.health,
            max_health: state.max_health,
            stats: state.stats,
            last_processed_tick,
        }
    }

    pub fn to_state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            x: self.x,
            height: self.height,
            vel_x: self.vel_x,
            vel_y: self.vel_y,
            facing: self.facing,
            is_jumping: self.is_jumping,
            is_crouching: self.is_crouching,
            attack: self.attack,
            health: self.health,
            max_health: self.max_health,
            stats: self.stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateMessage {
    pub tick: Tick,
    pub players: Vec<PlayerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientEvent {
    #[serde(rename = "connect")]
    Connect {
        #[serde(rename = "clientVersion")]
        client_version: u32,
    },
    #[serde(rename = "ib")]
    InputBatch(InputBatch),
    #[serde(rename = "ping")]
    Ping {
        seq: u32,
        #[serde(rename = "clientSentAt")]
        client_sent_at: f64,
    },
    #[serde(rename = "probeReply")]
    ProbeReply(LatencyProbe),
    #[serde(rename = "disconnect")]
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    #[serde(rename = "matchStart")]
    MatchStart(MatchStart),
    #[serde(rename = "gs")]
    GameState(GameStateMessage),
    #[serde(rename = "pong")]
    Pong {
        seq: u32,
        #[serde(rename = "clientSentAt")]
        client_sent_at: f64,
    },
    #[serde(rename = "latencyProbe")]
    LatencyProbe(LatencyProbe),
    #[serde(rename = "latencyAck")]
    LatencyAck {
        seq: u32,
        #[serde(rename = "latencyMs")]
        latency_ms: f64,
    },
    #[serde(rename = "playerJoined")]
    PlayerJoined(PlayerSnapshot),
    #[serde(rename = "playerLeft")]
    PlayerLeft { id: PlayerId },
    #[serde(rename = "disconnected")]
    Disconnected { reason: String },
}

/// Binary form used on the datagram transport.
pub fn encode<T: Serialize>(event: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(event)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(bytes)
}

/// JSON form used by socket-style transports.
pub fn to_json<T: Serialize>(event: &T) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

pub fn from_json<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::AttackType;
    use serde_json::json;

    #[test]
    fn test_input_batch_json_shape() {
        let event = ClientEvent::InputBatch(InputBatch {
            frames: vec![
                WireInput {
                    t: 1001,
                    f: Some(7),
                    k: 2,
                },
                WireInput {
                    t: 1002,
                    f: None,
                    k: 0,
                },
            ],
        });

        let value: serde_json::Value = serde_json::from_str(&to_json(&event).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "ib": { "b": [
                { "t": 1001, "f": 7, "k": 2 },
                { "t": 1002, "f": null, "k": 0 }
            ] } })
        );
    }

    #[test]
    fn test_match_start_from_json() {
        let text = r#"{"matchStart":{"serverTick":1000,"serverTimeMs":123456,"tickRate":60,"matchStartTick":990}}"#;
        let event: ServerEvent = from_json(text).unwrap();
        assert_eq!(
            event,
            ServerEvent::MatchStart(MatchStart {
                server_tick: 1000,
                server_time_ms: 123456,
                tick_rate: 60,
                match_start_tick: 990,
            })
        );
    }

    #[test]
    fn test_probe_reply_echoes_fields() {
        let probe = LatencyProbe {
            seq: 9,
            server_sent_at: 1500.5,
        };
        let value: serde_json::Value =
            serde_json::from_str(&to_json(&ClientEvent::ProbeReply(probe)).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "probeReply": { "seq": 9, "serverSentAt": 1500.5 } })
        );
    }

    #[test]
    fn test_game_state_binary_codec() {
        let mut state = PlayerState::new(4, 120.0, CharacterStats::default());
        state.attack = Some(ActiveAttack {
            kind: AttackType::LowKick,
            remaining_ticks: 4,
        });
        let event = ServerEvent::GameState(GameStateMessage {
            tick: 77,
            players: vec![PlayerSnapshot::from_state(&state, Some(75))],
        });

        let decoded: ServerEvent = decode(&encode(&event).unwrap()).unwrap();
        match decoded {
            ServerEvent::GameState(message) => {
                assert_eq!(message.tick, 77);
                assert_eq!(message.players[0].last_processed_tick, Some(75));
                assert_eq!(message.players[0].to_state(), state);
            }
            other => panic!("Wrong event after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_datagram_is_rejected() {
        let bytes = encode(&ClientEvent::Connect { client_version: 1 }).unwrap();
        assert!(decode::<ClientEvent>(&bytes[..bytes.len() / 2]).is_err());
        assert!(decode::<ClientEvent>(&[]).is_err());
    }

    #[test]
    fn test_wire_input_requires_tick() {
        let untagged = InputSnapshot {
            tick: None,
            frame: Some(3),
            flags: InputFlags::default(),
        };
        assert!(WireInput::from_snapshot(&untagged).is_none());

        let tagged = InputSnapshot {
            tick: Some(12),
            ..untagged
        };
        let wire = WireInput::from_snapshot(&tagged).unwrap();
        assert_eq!(wire.t, 12);
        assert_eq!(wire.to_snapshot(), Some(tagged));
    }
}
