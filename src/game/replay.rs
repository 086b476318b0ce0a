//! Round Transcripts
//!
//! A transcript is everything needed to re-simulate a match: roster, seed,
//! configuration, the delta-compressed input streams and the contact log.
//! `verify` replays it from scratch and compares the final state hash, so
//! any copy of the server can audit a reported outcome.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::hash::StateHash;
use crate::game::authority::Authority;
use crate::game::fighter::{EntityId, Team};
use crate::game::hit::Contact;
use crate::game::input::{FighterInputBuffer, InputSnapshot};
use crate::game::tick::{ArenaConfig, ArenaState, replay_match};

/// Outcome of a transcript verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayVerification {
    /// Did the replay reproduce the recorded hash?
    pub matches: bool,
    /// Hash recorded by the live match
    pub expected: StateHash,
    /// Hash produced by the replay
    pub replayed: StateHash,
}

/// Recording of one complete match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundTranscript {
    /// Match identifier
    pub match_id: [u8; 16],

    /// Base RNG seed
    pub rng_seed: u64,

    /// Fighters and their teams, in id order
    pub roster: Vec<(EntityId, Team)>,

    /// The configuration the match ran under
    pub config: ArenaConfig,

    /// Wall-clock start (metadata only, never fed to the simulation)
    pub started_at: DateTime<Utc>,

    /// Wall-clock end
    pub finished_at: Option<DateTime<Utc>>,

    /// Last simulated tick
    pub end_tick: u32,

    /// Final state hash of the live run
    pub final_hash: StateHash,

    /// Per-fighter input recordings
    inputs: BTreeMap<EntityId, FighterInputBuffer>,

    /// Contacts delivered to the simulation, stamped with the tick they
    /// were consumed on
    contact_log: Vec<(u32, Contact)>,
}

impl RoundTranscript {
    /// Start recording a match.
    pub fn new(
        match_id: [u8; 16],
        rng_seed: u64,
        roster: Vec<(EntityId, Team)>,
        config: ArenaConfig,
    ) -> Self {
        let inputs = roster
            .iter()
            .map(|(id, _)| (*id, FighterInputBuffer::new(*id)))
            .collect();

        Self {
            match_id,
            rng_seed,
            roster,
            config,
            started_at: Utc::now(),
            finished_at: None,
            end_tick: 0,
            final_hash: [0; 32],
            inputs,
            contact_log: Vec::new(),
        }
    }

    /// Record one fighter's input for a tick.
    pub fn record_input(&mut self, tick: u32, entity: EntityId, snapshot: InputSnapshot) {
        self.inputs
            .entry(entity)
            .or_insert_with(|| FighterInputBuffer::new(entity))
            .record(tick, snapshot);
    }

    /// Record a contact consumed on a tick.
    pub fn record_contact(&mut self, tick: u32, contact: Contact) {
        self.contact_log.push((tick, contact));
    }

    /// Seal the transcript with the live run's final tick and hash.
    pub fn finalize(&mut self, end_tick: u32, final_hash: StateHash) {
        self.end_tick = end_tick;
        self.final_hash = final_hash;
        self.finished_at = Some(Utc::now());
    }

    /// Number of recorded input deltas across all fighters.
    pub fn input_delta_count(&self) -> usize {
        self.inputs.values().map(|b| b.delta_count()).sum()
    }

    /// Serialize to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Re-simulate the match from this transcript and compare hashes.
    pub fn verify(&self) -> ReplayVerification {
        let mut state = ArenaState::new(self.match_id, self.rng_seed, &self.config);
        for (id, team) in &self.roster {
            state.add_fighter(*id, team.clone(), &self.config);
        }
        let authority = Authority::host_of(self.roster.iter().map(|(id, _)| *id));

        let (final_state, _) = replay_match(
            state,
            &self.inputs,
            &self.contact_log,
            &authority,
            &self.config,
            self.end_tick,
        );

        let replayed = final_state.compute_hash();
        let matches = replayed == self.final_hash;
        info!(
            match_id = %hex::encode(self.match_id),
            matches,
            expected = %hex::encode(self.final_hash),
            replayed = %hex::encode(replayed),
            "transcript verification"
        );

        ReplayVerification {
            matches,
            expected: self.final_hash,
            replayed,
        }
    }
}
