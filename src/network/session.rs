//! Arena Session Management
//!
//! One session per match: fighters join and ready up, the session drives
//! the deterministic simulation at the tick rate, broadcasts outcomes to
//! every connected client and records a transcript for audit. The session
//! core is synchronous and fully testable; `run_session` wraps it in the
//! async driver.

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::TICK_RATE;
use crate::game::authority::Authority;
use crate::game::fighter::{EntityId, Team};
use crate::game::input::InputSnapshot;
use crate::game::replay::RoundTranscript;
use crate::game::tick::{ArenaConfig, ArenaPhase, ArenaState, TickResult, tick};
use crate::network::protocol::{
    FighterInput, ServerMessage, event_to_message, state_update,
};

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Session-level errors. All are reported to the offending client and
/// leave the session itself running.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No free fighter slot.
    #[error("the arena is full")]
    ArenaFull,

    /// The match is already underway.
    #[error("the match has already started")]
    MatchStarted,

    /// The sender never joined.
    #[error("fighter {0} is not part of this session")]
    UnknownFighter(u32),
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum fighters in the arena
    pub max_fighters: usize,
    /// Minimum fighters before the countdown can start
    pub min_fighters: usize,
    /// Broadcast a state snapshot every N ticks
    pub snapshot_interval: u32,
    /// Match configuration
    pub arena: ArenaConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_fighters: 4,
            min_fighters: 2,
            snapshot_interval: 3, // 20 Hz snapshots at a 60 Hz simulation
            arena: ArenaConfig::default(),
        }
    }
}

/// Reply to a successful join.
#[derive(Debug)]
pub struct JoinAck {
    /// Assigned fighter id
    pub entity: EntityId,
    /// Match identifier
    pub match_id: SessionId,
    /// Health each fighter starts a round with
    pub base_health: i32,
}

/// One arena match in progress.
pub struct ArenaSession {
    /// Session / match identifier
    pub id: SessionId,
    config: SessionConfig,
    state: ArenaState,
    authority: Authority,
    pending_inputs: BTreeMap<EntityId, InputSnapshot>,
    ready: BTreeMap<EntityId, bool>,
    next_entity: u32,
    transcript: Option<RoundTranscript>,
    transcript_sealed: bool,
    outbound: broadcast::Sender<ServerMessage>,
}

impl ArenaSession {
    /// Create a fresh session.
    pub fn new(config: SessionConfig) -> Self {
        let id: SessionId = *uuid::Uuid::new_v4().as_bytes();
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&id[..8]);
        let seed = u64::from_le_bytes(seed_bytes);
        let state = ArenaState::new(id, seed, &config.arena);
        let (outbound, _) = broadcast::channel(512);

        info!(match_id = %hex::encode(id), "session created");
        Self {
            id,
            config,
            state,
            authority: Authority::host_of([]),
            pending_inputs: BTreeMap::new(),
            ready: BTreeMap::new(),
            next_entity: 1,
            transcript: None,
            transcript_sealed: false,
            outbound,
        }
    }

    /// Subscribe to the session's broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.outbound.subscribe()
    }

    /// Current arena state (read-only).
    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Has the match concluded and the arena shut down?
    pub fn is_ended(&self) -> bool {
        matches!(self.state.phase, ArenaPhase::Ended)
    }

    /// Add a fighter. Only possible while the arena is still assembling.
    pub fn join(&mut self, name: &str, team: &str) -> Result<JoinAck, SessionError> {
        if !matches!(self.state.phase, ArenaPhase::Waiting) {
            return Err(SessionError::MatchStarted);
        }
        if self.state.registry.len() >= self.config.max_fighters {
            return Err(SessionError::ArenaFull);
        }

        let entity = EntityId(self.next_entity);
        self.next_entity += 1;

        self.state.add_fighter(entity, Team::new(team), &self.config.arena);
        self.authority.grant(entity);
        self.ready.insert(entity, false);

        let _ = self.outbound.send(ServerMessage::FighterJoined {
            entity: entity.0,
            team: team.to_string(),
            name: name.to_string(),
        });

        Ok(JoinAck {
            entity,
            match_id: self.id,
            base_health: self.config.arena.base_health,
        })
    }

    /// Mark a fighter ready. When the whole roster is ready and large
    /// enough, the countdown begins and the transcript starts recording.
    pub fn mark_ready(&mut self, entity: EntityId) -> Result<(), SessionError> {
        let Some(flag) = self.ready.get_mut(&entity) else {
            return Err(SessionError::UnknownFighter(entity.0));
        };
        *flag = true;

        let enough = self.ready.len() >= self.config.min_fighters;
        let all_ready = self.ready.values().all(|r| *r);
        if enough && all_ready && matches!(self.state.phase, ArenaPhase::Waiting) {
            info!(match_id = %hex::encode(self.id), fighters = self.ready.len(), "all ready, starting countdown");

            let roster: Vec<(EntityId, Team)> = self
                .state
                .registry
                .iter()
                .map(|f| (f.id, f.team.clone()))
                .collect();
            self.transcript = Some(RoundTranscript::new(
                self.id,
                self.state.rng_seed,
                roster,
                self.config.arena.clone(),
            ));

            self.state.begin_countdown(&self.config.arena);
            let _ = self.outbound.send(ServerMessage::CountdownStarted {
                ticks: self.config.arena.countdown_ticks,
            });
        }
        Ok(())
    }

    /// Accept input from a fighter. Latest submission for a tick wins.
    pub fn submit_input(&mut self, entity: EntityId, input: FighterInput) -> Result<(), SessionError> {
        if self.state.registry.get(entity).is_none() {
            return Err(SessionError::UnknownFighter(entity.0));
        }
        self.pending_inputs.insert(entity, input.to_snapshot());
        Ok(())
    }

    /// Remove a fighter from the match entirely.
    pub fn leave(&mut self, entity: EntityId) {
        if self.state.registry.remove(entity).is_none() {
            warn!(entity = entity.0, "leave for unknown fighter");
            return;
        }
        self.authority.revoke(entity);
        self.ready.remove(&entity);
        self.pending_inputs.remove(&entity);
        info!(entity = entity.0, "fighter left the arena");
    }

    /// Drive one simulation tick and broadcast its outcomes.
    pub fn step(&mut self) -> TickResult {
        let fighting = matches!(self.state.phase, ArenaPhase::Fighting);
        let upcoming = self.state.tick + 1;

        let inputs = self.pending_inputs.clone();
        let contacts = if fighting {
            self.state.sense_contacts()
        } else {
            Vec::new()
        };

        if fighting {
            if let Some(transcript) = &mut self.transcript {
                for (id, snap) in &inputs {
                    transcript.record_input(upcoming, *id, *snap);
                }
                for contact in &contacts {
                    transcript.record_contact(upcoming, *contact);
                }
            }
        }

        let result = tick(
            &mut self.state,
            &inputs,
            &contacts,
            &self.authority,
            &self.config.arena,
        );

        // Edge-triggered buttons fire once per submission
        for snap in self.pending_inputs.values_mut() {
            snap.set_attack(false);
            snap.set_block(false);
        }

        for event in &result.events {
            if let Some(message) = event_to_message(event) {
                let _ = self.outbound.send(message);
            }
        }

        if fighting && self.state.tick % self.config.snapshot_interval.max(1) == 0 {
            let _ = self.outbound.send(state_update(&self.state));
        }

        if result.match_ended && !self.transcript_sealed {
            if let Some(transcript) = &mut self.transcript {
                transcript.finalize(self.state.tick, self.state.compute_hash());
                self.transcript_sealed = true;
                debug!(
                    match_id = %hex::encode(self.id),
                    deltas = transcript.input_delta_count(),
                    end_tick = self.state.tick,
                    "transcript sealed"
                );
            }
        }

        result
    }

    /// Take the sealed transcript, if the match has produced one.
    pub fn take_transcript(&mut self) -> Option<RoundTranscript> {
        if self.transcript_sealed {
            self.transcript.take()
        } else {
            None
        }
    }
}

// =============================================================================
// ASYNC DRIVER
// =============================================================================

/// Commands a connection task can send to the session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Join the arena.
    Join {
        /// Display name
        name: String,
        /// Team tag
        team: String,
        /// Reply with the ack and a broadcast subscription
        reply: oneshot::Sender<Result<(JoinAck, broadcast::Receiver<ServerMessage>), SessionError>>,
    },
    /// Ready to fight.
    Ready {
        /// The fighter
        entity: EntityId,
    },
    /// Input for the current tick.
    Input {
        /// The fighter
        entity: EntityId,
        /// The input
        input: FighterInput,
    },
    /// Leave the arena.
    Leave {
        /// The fighter
        entity: EntityId,
    },
}

/// Drive a session at the tick rate until the match ends or every command
/// sender is gone.
pub async fn run_session(mut session: ArenaSession, mut commands: mpsc::Receiver<SessionCommand>) {
    let mut ticker = interval(Duration::from_micros(1_000_000 / TICK_RATE as u64));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.step();
                if session.is_ended() {
                    info!(match_id = %hex::encode(session.id), "session finished");
                    break;
                }
            }
            command = commands.recv() => {
                match command {
                    Some(SessionCommand::Join { name, team, reply }) => {
                        let ack = session.join(&name, &team)
                            .map(|ack| (ack, session.subscribe()));
                        let _ = reply.send(ack);
                    }
                    Some(SessionCommand::Ready { entity }) => {
                        if let Err(err) = session.mark_ready(entity) {
                            warn!(entity = entity.0, %err, "ready rejected");
                        }
                    }
                    Some(SessionCommand::Input { entity, input }) => {
                        if let Err(err) = session.submit_input(entity, input) {
                            debug!(entity = entity.0, %err, "input rejected");
                        }
                    }
                    Some(SessionCommand::Leave { entity }) => {
                        session.leave(entity);
                    }
                    None => break,
                }
            }
        }
    }
}
