//! Game Events
//!
//! Events generated during simulation, broadcast to observers and recorded
//! for replay. Totally ordered by (tick, priority, entity) so every copy of
//! the match agrees on processing order.

use serde::{Serialize, Deserialize};

use crate::game::fighter::{EntityId, Team};

/// Priority for event processing order. Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Hits land before anything reacts to their consequences
    HitResolution = 0,
    /// Then knockouts
    Defeat = 1,
    /// Then round bookkeeping
    RoundEnd = 2,
    /// Then match bookkeeping
    MatchEnd = 3,
    /// Lowest priority
    Other = 255,
}

/// Game event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// An attack connected
    HitLanded {
        /// Fighter that landed the attack
        attacker: EntityId,
        /// Fighter being hit
        target: EntityId,
        /// Damage points dealt
        damage: u32,
        /// Hitstun ticks forced onto the target
        hitstun: u32,
        /// Per-attack de-duplication key
        sequence: u32,
    },

    /// A fighter was knocked out this round
    FighterDefeated {
        /// The knocked-out fighter
        entity: EntityId,
        /// Their team
        team: Team,
    },

    /// A round concluded
    RoundEnded {
        /// Round number (1-based)
        round: u32,
        /// Winning team; `None` on a double knockout
        winning_team: Option<Team>,
        /// The winner's updated tally (0 on a draw)
        wins: u32,
    },

    /// The match concluded
    MatchEnded {
        /// The team that took the match
        winning_team: Team,
    },

    /// A new round began
    RoundStarted {
        /// Round number (1-based)
        round: u32,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when the event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Fighter involved (for tie-breaking)
    pub entity: Option<EntityId>,

    /// Event payload
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let entity = match &data {
            GameEventData::HitLanded { target, .. } => Some(*target),
            GameEventData::FighterDefeated { entity, .. } => Some(*entity),
            _ => None,
        };

        Self {
            tick,
            priority,
            entity,
            data,
        }
    }

    /// A landed hit, carrying everything observers need to apply it.
    pub fn hit_landed(tick: u32, hit: &crate::game::hit::HitEvent) -> Self {
        Self::new(
            tick,
            EventPriority::HitResolution,
            GameEventData::HitLanded {
                attacker: hit.attacker,
                target: hit.target,
                damage: hit.damage,
                hitstun: hit.hitstun,
                sequence: hit.sequence,
            },
        )
    }

    /// A fighter knocked out.
    pub fn fighter_defeated(tick: u32, entity: EntityId, team: Team) -> Self {
        Self::new(
            tick,
            EventPriority::Defeat,
            GameEventData::FighterDefeated { entity, team },
        )
    }

    /// A round concluded.
    pub fn round_ended(tick: u32, round: u32, winning_team: Option<Team>, wins: u32) -> Self {
        Self::new(
            tick,
            EventPriority::RoundEnd,
            GameEventData::RoundEnded {
                round,
                winning_team,
                wins,
            },
        )
    }

    /// The match concluded.
    pub fn match_ended(tick: u32, winning_team: Team) -> Self {
        Self::new(
            tick,
            EventPriority::MatchEnd,
            GameEventData::MatchEnded { winning_team },
        )
    }

    /// A round began.
    pub fn round_started(tick: u32, round: u32) -> Self {
        Self::new(tick, EventPriority::Other, GameEventData::RoundStarted { round })
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.priority == other.priority && self.entity == other.entity
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.entity.cmp(&other.entity))
    }
}
