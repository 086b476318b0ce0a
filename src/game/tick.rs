//! Authoritative Simulation Tick
//!
//! The per-tick update pass for one arena. Everything that can change
//! combat state happens inside `tick()`, in a fixed order, over a
//! consistent snapshot: animators advance, state machines evaluate, hits
//! resolve, knockouts process, the round controller polls. No intra-tick
//! parallelism; BTreeMap order everywhere. Same inputs, same seed, same
//! result on any platform.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::ROUND_DURATION_TICKS;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::{DeterministicRng, derive_round_seed};
use crate::game::authority::Authority;
use crate::game::combat::MoveSet;
use crate::game::contact::ContactTracker;
use crate::game::events::GameEvent;
use crate::game::fighter::{EntityId, Fighter, Team};
use crate::game::hit::{Contact, apply_hit, resolve_contact};
use crate::game::input::{FighterInputBuffer, InputSnapshot};
use crate::game::registry::EntityRegistry;
use crate::game::round::{ActionKind, RoundController};
use crate::game::wreck::{ScrapHeap, REMAINS_ASSET};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Is the current round concluded?
    pub round_ended: bool,
    /// Is the match concluded?
    pub match_ended: bool,
    /// Delayed action that fired this tick, if any
    pub fired: Option<ActionKind>,
}

/// Configuration for a match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Health every fighter starts a round with
    pub base_health: i32,
    /// Round length in ticks
    pub round_ticks: u32,
    /// Rounds a team needs to take the match
    pub wins_to_take_match: u32,
    /// Pre-round countdown in ticks
    pub countdown_ticks: u32,
    /// Delay before the next round begins
    pub next_round_delay_ticks: u32,
    /// Delay before the arena is torn down after the match
    pub leave_delay_ticks: u32,
    /// Frame data for every chassis
    pub moves: MoveSet,
    /// Remains prop used by the wreck effect; `None` models the asset
    /// being absent
    pub remains_asset: Option<String>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            base_health: 1000,
            round_ticks: ROUND_DURATION_TICKS,
            wins_to_take_match: 2,
            countdown_ticks: 180,         // 3 seconds
            next_round_delay_ticks: 300,  // 5 seconds
            leave_delay_ticks: 180,       // 3 seconds
            moves: MoveSet::default(),
            remains_asset: Some(REMAINS_ASSET.to_string()),
        }
    }
}

/// Coarse lifecycle of an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArenaPhase {
    /// Waiting for fighters to assemble
    #[default]
    Waiting,
    /// Pre-round countdown
    Countdown {
        /// Ticks until the round starts
        ticks_remaining: u32,
    },
    /// A round is in progress
    Fighting,
    /// The match is over and the arena torn down
    Ended,
}

/// Complete state of one arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArenaState {
    /// Match identifier
    pub match_id: [u8; 16],

    /// Current simulation tick
    pub tick: u32,

    /// Current round (1-based; 0 before the first round)
    pub round: u32,

    /// Lifecycle phase
    pub phase: ArenaPhase,

    /// Base RNG seed for the match
    pub rng_seed: u64,

    /// Deterministic RNG (re-derived per round from the roster)
    pub rng: DeterministicRng,

    /// All fighters, split into all/alive
    pub registry: EntityRegistry,

    /// Round and match termination logic
    pub controller: RoundController,

    /// Wreck-effect bookkeeping
    pub scrap: ScrapHeap,

    /// Built-in overlap sensing (engine deployments feed their own)
    pub contacts: ContactTracker,
}

impl ArenaState {
    /// Create an empty arena.
    pub fn new(match_id: [u8; 16], rng_seed: u64, config: &ArenaConfig) -> Self {
        Self {
            match_id,
            tick: 0,
            round: 0,
            phase: ArenaPhase::Waiting,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            registry: EntityRegistry::new(),
            controller: RoundController::new(
                config.round_ticks,
                config.wins_to_take_match,
                config.next_round_delay_ticks,
                config.leave_delay_ticks,
            ),
            scrap: ScrapHeap::new(config.remains_asset.clone()),
            contacts: ContactTracker::new(),
        }
    }

    /// Add a fighter to the match at a random spawn point.
    pub fn add_fighter(&mut self, id: EntityId, team: Team, config: &ArenaConfig) {
        let spawn = self.rng.spawn_position();
        info!(entity = id.0, team = %team, "fighter joined the arena");
        self.registry
            .insert(Fighter::new(id, team, spawn, config.base_health, config.moves));
    }

    /// Enter the pre-round countdown.
    pub fn begin_countdown(&mut self, config: &ArenaConfig) {
        self.phase = ArenaPhase::Countdown {
            ticks_remaining: config.countdown_ticks,
        };
    }

    /// Reset the arena for a fresh round and start fighting.
    pub fn start_round(&mut self, config: &ArenaConfig) {
        self.round += 1;

        let roster: Vec<u32> = self.registry.ids().iter().map(|id| id.0).collect();
        self.rng = DeterministicRng::new(derive_round_seed(&self.match_id, self.round, &roster));

        let tick = self.tick;
        let base_health = config.base_health;
        let Self { registry, scrap, rng, .. } = self;
        for fighter in registry.iter_mut() {
            let spawn = rng.spawn_position();
            fighter.reset_for_round(spawn, base_health, tick, scrap);
        }
        registry.reset_alive();

        self.contacts.clear();
        self.controller.begin_round();
        self.phase = ArenaPhase::Fighting;
        info!(round = self.round, tick, "round started");
    }

    /// Run the built-in overlap sensing against current fighter positions.
    pub fn sense_contacts(&mut self) -> Vec<Contact> {
        let Self { contacts, registry, .. } = self;
        contacts.detect(registry)
    }

    /// Compute the verification hash of the current state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_u32(self.round);

            for fighter in self.registry.iter() {
                fighter.hash_into(hasher);
                hasher.update_bool(self.registry.is_alive(fighter.id));
            }

            hasher.update_bool(self.controller.round_finished);
            hasher.update_bool(self.controller.match_finished);
            hasher.update_u32(self.controller.timer.remaining_ticks());
            for (team, wins) in self.controller.scoreboard.standings() {
                hasher.update_str(team.as_str());
                hasher.update_u32(wins);
            }
        })
    }
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - the arena (mutated)
/// * `inputs` - per-fighter input for this tick (BTreeMap: deterministic order)
/// * `contacts` - physical contacts delivered since the last tick
/// * `authority` - what this simulation copy is allowed to decide
/// * `config` - match configuration
pub fn tick(
    state: &mut ArenaState,
    inputs: &BTreeMap<EntityId, InputSnapshot>,
    contacts: &[Contact],
    authority: &Authority,
    config: &ArenaConfig,
) -> TickResult {
    let mut result = TickResult::default();

    match state.phase {
        ArenaPhase::Waiting => return result,
        ArenaPhase::Countdown { ticks_remaining } => {
            if ticks_remaining == 0 {
                state.start_round(config);
                result.events.push(GameEvent::round_started(state.tick, state.round));
            } else {
                state.phase = ArenaPhase::Countdown {
                    ticks_remaining: ticks_remaining - 1,
                };
            }
            return result;
        }
        ArenaPhase::Ended => {
            result.match_ended = true;
            return result;
        }
        ArenaPhase::Fighting => {}
    }

    state.tick += 1;
    let now = state.tick;
    let round = state.round;
    let mut events: Vec<GameEvent> = Vec::new();

    {
        let ArenaState { registry, scrap, controller, .. } = state;

        // 1. Animation playback advances
        for fighter in registry.iter_mut() {
            fighter.animator.advance();
        }

        // 2. State machines: one transition or one tick effect per fighter
        for id in registry.ids() {
            let input = inputs.get(&id).copied().unwrap_or_default();
            if let Some(fighter) = registry.get_mut(id) {
                fighter.update(now, &input, scrap);
            }
        }

        // 3. Hit resolution (host-side) and local application
        for contact in contacts {
            if let Some(hit) = resolve_contact(registry, authority, contact) {
                if apply_hit(registry, &hit, now, scrap) {
                    info!(
                        attacker = hit.attacker.0,
                        victim = hit.target.0,
                        damage = hit.damage,
                        tick = now,
                        "hit landed"
                    );
                    events.push(GameEvent::hit_landed(now, &hit));
                }
            }
        }

        // 4. Knockouts
        for id in registry.alive_ids() {
            let downed = registry.get(id).map(|f| f.is_defeated()).unwrap_or(false);
            if downed {
                controller.handle_defeat(registry, authority, id, round, now, scrap, &mut events);
            }
        }

        // 5. Round clock, timeouts, delayed flows
        result.fired = controller.poll(registry, authority, round, now, scrap, &mut events);
    }

    match result.fired {
        Some(ActionKind::NextRound) => {
            state.start_round(config);
            events.push(GameEvent::round_started(state.tick, state.round));
        }
        Some(ActionKind::LeaveArena) => {
            info!(tick = now, "leaving the arena");
            state.phase = ArenaPhase::Ended;
        }
        None => {}
    }

    result.round_ended = state.controller.round_finished;
    result.match_ended =
        state.controller.match_finished || matches!(state.phase, ArenaPhase::Ended);
    result.events = events;
    result
}

/// Re-simulate a match from recorded inputs and contacts.
///
/// Returns the final state and all events. With the inputs and contacts of
/// a live match, the final hash matches the live one bit-for-bit.
pub fn replay_match(
    mut state: ArenaState,
    inputs: &BTreeMap<EntityId, FighterInputBuffer>,
    contact_log: &[(u32, Contact)],
    authority: &Authority,
    config: &ArenaConfig,
    tick_count: u32,
) -> (ArenaState, Vec<GameEvent>) {
    let mut all_events = Vec::new();

    if matches!(state.phase, ArenaPhase::Waiting) {
        state.start_round(config);
    }

    for _ in 0..tick_count {
        let next = state.tick + 1;

        let mut tick_inputs = BTreeMap::new();
        for (id, buffer) in inputs {
            tick_inputs.insert(*id, buffer.input_at(next));
        }

        let tick_contacts: Vec<Contact> = contact_log
            .iter()
            .filter(|(t, _)| *t == next)
            .map(|(_, c)| *c)
            .collect();

        let result = tick(&mut state, &tick_inputs, &tick_contacts, authority, config);
        all_events.extend(result.events);

        if matches!(state.phase, ArenaPhase::Ended) {
            break;
        }
    }

    (state, all_events)
}
