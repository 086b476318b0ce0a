//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. Messages
//! are tagged JSON for debugging ease; the simulation itself never sees
//! them - the session layer translates to and from game types.

use serde::{Serialize, Deserialize};

use crate::core::fixed::to_float;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::fighter::EntityId;
use crate::game::input::InputSnapshot;
use crate::game::tick::ArenaState;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the arena.
    Join(JoinRequest),

    /// Ready to fight.
    Ready,

    /// Input for the current tick.
    Input(FighterInput),

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back
        timestamp: u64,
    },

    /// Leaving the arena.
    Leave,
}

/// Join request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Display name
    pub name: String,
    /// Team tag to fight for
    pub team: String,
}

/// One tick of fighter input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FighterInput {
    /// Client tick number
    pub tick: u32,
    /// Stick X axis (-127..=127, -128 = released)
    pub stick_x: i8,
    /// Stick Y axis (-127..=127, -128 = released)
    pub stick_y: i8,
    /// Button flags (see `InputSnapshot`)
    pub buttons: u8,
}

impl FighterInput {
    /// Convert to a simulation input snapshot.
    pub fn to_snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            stick_x: self.stick_x,
            stick_y: self.stick_y,
            buttons: self.buttons,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join accepted.
    Welcome {
        /// Assigned fighter id
        entity: u32,
        /// Match identifier (hex)
        match_id: String,
        /// Simulation tick rate in Hz
        tick_rate: u32,
        /// Health each fighter starts a round with
        base_health: i32,
    },

    /// Another fighter joined.
    FighterJoined {
        /// Fighter id
        entity: u32,
        /// Their team tag
        team: String,
        /// Their display name
        name: String,
    },

    /// Pre-round countdown began.
    CountdownStarted {
        /// Countdown length in ticks
        ticks: u32,
    },

    /// A round began.
    RoundStarted {
        /// Round number (1-based)
        round: u32,
    },

    /// Periodic state snapshot.
    StateUpdate {
        /// Simulation tick
        tick: u32,
        /// All fighters
        fighters: Vec<FighterSnapshot>,
    },

    /// An attack connected. Observers apply this outcome verbatim.
    Hit {
        /// Simulation tick
        tick: u32,
        /// Fighter that landed the attack
        attacker: u32,
        /// Fighter being hit
        target: u32,
        /// Damage points dealt
        damage: u32,
        /// Hitstun ticks forced onto the target
        hitstun: u32,
        /// Per-attack de-duplication key
        sequence: u32,
    },

    /// A fighter was knocked out.
    FighterDefeated {
        /// Simulation tick
        tick: u32,
        /// The knocked-out fighter
        entity: u32,
        /// Their team tag
        team: String,
    },

    /// A round concluded.
    RoundEnded {
        /// Simulation tick
        tick: u32,
        /// Round number
        round: u32,
        /// Winning team tag; absent on a double knockout
        winning_team: Option<String>,
        /// The winner's updated tally
        wins: u32,
    },

    /// The match concluded.
    MatchEnded {
        /// Simulation tick
        tick: u32,
        /// The team that took the match
        winning_team: String,
    },

    /// Ping reply.
    Pong {
        /// Echoed client timestamp
        timestamp: u64,
    },

    /// Request failed.
    Error {
        /// Machine-readable code
        code: ErrorCode,
        /// Human-readable detail
        message: String,
    },
}

/// Error codes for `ServerMessage::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message could not be parsed
    InvalidMessage,
    /// The arena has no free slot
    ArenaFull,
    /// The match is already underway
    MatchStarted,
    /// The sender has not joined yet
    NotJoined,
}

/// One fighter in a state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterSnapshot {
    /// Fighter id
    pub entity: u32,
    /// Team tag
    pub team: String,
    /// Position X (display floats; simulation stays fixed-point)
    pub x: f32,
    /// Position Y
    pub y: f32,
    /// Current health
    pub health: i32,
    /// Current combat state name
    pub state: String,
    /// Is the fighter still in the round?
    pub alive: bool,
}

/// Build a state-update message from the arena.
pub fn state_update(state: &ArenaState) -> ServerMessage {
    let fighters = state
        .registry
        .iter()
        .map(|f| FighterSnapshot {
            entity: f.id.0,
            team: f.team.as_str().to_string(),
            x: to_float(f.body.position.x),
            y: to_float(f.body.position.y),
            health: f.health,
            state: f.machine.kind().to_string(),
            alive: state.registry.is_alive(f.id),
        })
        .collect();

    ServerMessage::StateUpdate {
        tick: state.tick,
        fighters,
    }
}

/// Translate a simulation event into its broadcast message, if it has one.
pub fn event_to_message(event: &GameEvent) -> Option<ServerMessage> {
    match &event.data {
        GameEventData::HitLanded {
            attacker,
            target,
            damage,
            hitstun,
            sequence,
        } => Some(ServerMessage::Hit {
            tick: event.tick,
            attacker: attacker.0,
            target: target.0,
            damage: *damage,
            hitstun: *hitstun,
            sequence: *sequence,
        }),

        GameEventData::FighterDefeated { entity, team } => Some(ServerMessage::FighterDefeated {
            tick: event.tick,
            entity: entity.0,
            team: team.as_str().to_string(),
        }),

        GameEventData::RoundEnded {
            round,
            winning_team,
            wins,
        } => Some(ServerMessage::RoundEnded {
            tick: event.tick,
            round: *round,
            winning_team: winning_team.as_ref().map(|t| t.as_str().to_string()),
            wins: *wins,
        }),

        GameEventData::MatchEnded { winning_team } => Some(ServerMessage::MatchEnded {
            tick: event.tick,
            winning_team: winning_team.as_str().to_string(),
        }),

        GameEventData::RoundStarted { round } => Some(ServerMessage::RoundStarted {
            round: *round,
        }),
    }
}

/// Helper for addressing per-target traffic: the fighter a message
/// concerns, when it is addressed to one.
pub fn addressed_entity(message: &ServerMessage) -> Option<EntityId> {
    match message {
        ServerMessage::Hit { target, .. } => Some(EntityId(*target)),
        ServerMessage::FighterDefeated { entity, .. } => Some(EntityId(*entity)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fighter::Team;
    use crate::game::hit::HitEvent;

    #[test]
    fn test_client_message_tagged_json() {
        let msg = ClientMessage::Join(JoinRequest {
            name: "crusher".to_string(),
            team: "red".to_string(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "join");
        assert_eq!(json["name"], "crusher");

        let parsed: ClientMessage = serde_json::from_value(json).unwrap();
        assert!(matches!(parsed, ClientMessage::Join(_)));
    }

    #[test]
    fn test_input_roundtrip() {
        let input = FighterInput {
            tick: 42,
            stick_x: 90,
            stick_y: -30,
            buttons: InputSnapshot::BTN_ATTACK | InputSnapshot::BTN_RUN,
        };
        let json = serde_json::to_string(&ClientMessage::Input(input)).unwrap();
        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();

        let ClientMessage::Input(parsed) = parsed else {
            panic!("expected input");
        };
        let snap = parsed.to_snapshot();
        assert!(snap.attack_pressed());
        assert!(snap.run_held());
        assert_eq!(snap.stick_x, 90);
    }

    #[test]
    fn test_hit_event_conversion() {
        let hit = HitEvent {
            attacker: EntityId(1),
            target: EntityId(2),
            damage: 2,
            hitstun: 30,
            sequence: 99,
        };
        let event = GameEvent::hit_landed(10, &hit);
        let msg = event_to_message(&event).unwrap();

        match &msg {
            ServerMessage::Hit { tick, attacker, target, sequence, .. } => {
                assert_eq!(*tick, 10);
                assert_eq!(*attacker, 1);
                assert_eq!(*target, 2);
                assert_eq!(*sequence, 99);
            }
            other => panic!("expected hit, got {other:?}"),
        }
        assert_eq!(addressed_entity(&msg), Some(EntityId(2)));
    }

    #[test]
    fn test_round_end_conversion() {
        let event = GameEvent::round_ended(100, 2, Some(Team::new("blue")), 1);
        let msg = event_to_message(&event).unwrap();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "round_ended");
        assert_eq!(json["winning_team"], "blue");
    }
}
