//! Fighter State
//!
//! Per-participant data: identity, team, health pool, locomotion body,
//! animation handle and the combat state machine. One `Fighter` per
//! networked entity.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::{Fixed, TICK_DURATION, fixed_mul};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::animation::{Animator, ClipAnimator};
use crate::game::combat::{CombatState, MoveSet};
use crate::game::hit::{HitEvent, HEALTH_PER_DAMAGE_POINT};
use crate::game::machine::{StateCtx, StateMachine};
use crate::game::wreck::Wrecker;

/// Stable participant identifier, unique for the lifetime of a match.
///
/// Implements `Ord` so every map keyed by it iterates deterministically.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Team tag. Fighters on the same team never damage each other.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Team(String);

impl Team {
    /// Create a team tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locomotion body on the arena floor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Body {
    /// Position on the arena floor
    pub position: FixedVec2,
    /// Current velocity (units/sec)
    pub velocity: FixedVec2,
    /// Facing direction (unit vector; last nonzero move direction)
    pub facing: FixedVec2,
}

impl Body {
    /// Create a body at a spawn point, facing forward.
    pub fn new(spawn: FixedVec2) -> Self {
        Self {
            position: spawn,
            velocity: FixedVec2::ZERO,
            facing: FixedVec2::FORWARD,
        }
    }

    /// Move one tick in the stick direction at the given speed, staying
    /// inside the arena.
    pub fn step(&mut self, dir: FixedVec2, speed: Fixed) {
        let dir = dir.normalize();
        if dir == FixedVec2::ZERO {
            self.halt();
            return;
        }

        self.velocity = dir.scale(speed);
        self.facing = dir;

        let delta = FixedVec2::new(
            fixed_mul(self.velocity.x, TICK_DURATION),
            fixed_mul(self.velocity.y, TICK_DURATION),
        );
        self.position = self.position.add(delta).clamp_to_arena();
    }

    /// Stop in place.
    pub fn halt(&mut self) {
        self.velocity = FixedVec2::ZERO;
    }
}

/// One participant in the match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fighter {
    /// Unique fighter id
    pub id: EntityId,

    /// Team tag
    pub team: Team,

    /// Current health. A fighter at 0 is knocked out.
    pub health: i32,

    /// Locomotion body
    pub body: Body,

    /// Animation playback handle
    pub animator: ClipAnimator,

    /// The moves this chassis performs
    pub moves: MoveSet,

    /// Combat state machine
    pub machine: StateMachine,

    /// Last applied hit sequence per attacker, for de-duplication of
    /// re-delivered hit events.
    last_hit_seq: BTreeMap<EntityId, u32>,
}

impl Fighter {
    /// Create a fighter at a spawn point.
    pub fn new(id: EntityId, team: Team, spawn: FixedVec2, base_health: i32, moves: MoveSet) -> Self {
        Self {
            id,
            team,
            health: base_health,
            body: Body::new(spawn),
            animator: ClipAnimator::new(),
            moves,
            machine: StateMachine::new(),
            last_hit_seq: BTreeMap::new(),
        }
    }

    /// Drive one simulation tick for this fighter.
    pub fn update(&mut self, tick: u32, input: &crate::game::input::InputSnapshot, wrecker: &mut dyn Wrecker) {
        let Self {
            id,
            body,
            animator,
            moves,
            machine,
            ..
        } = self;
        let mut ctx = StateCtx {
            entity: *id,
            tick,
            body,
            animator: animator as &mut dyn Animator,
            wrecker,
        };
        machine.update(&mut ctx, moves, input);
    }

    /// Force the machine into a state, with proper exit/enter pairing.
    pub fn force_state(&mut self, state: CombatState, tick: u32, wrecker: &mut dyn Wrecker) {
        let Self {
            id,
            body,
            animator,
            machine,
            ..
        } = self;
        let mut ctx = StateCtx {
            entity: *id,
            tick,
            body,
            animator: animator as &mut dyn Animator,
            wrecker,
        };
        machine.set_state(state, &mut ctx);
    }

    /// Apply an authoritative hit event addressed to this fighter.
    ///
    /// Returns false when the event is a re-delivery (same attacker, same
    /// or older sequence) and was ignored. A fresh event subtracts
    /// `damage * 100` from health and forces Hitstun over whatever state is
    /// current - including an earlier Hitstun; there is no stacking.
    pub fn receive_hit(&mut self, event: &HitEvent, tick: u32, wrecker: &mut dyn Wrecker) -> bool {
        if let Some(&seen) = self.last_hit_seq.get(&event.attacker) {
            if event.sequence <= seen {
                debug!(
                    victim = self.id.0,
                    attacker = event.attacker.0,
                    sequence = event.sequence,
                    "ignoring re-delivered hit"
                );
                return false;
            }
        }
        self.last_hit_seq.insert(event.attacker, event.sequence);

        let delta = event.damage as i32 * HEALTH_PER_DAMAGE_POINT;
        self.health = (self.health - delta).max(0);
        self.force_state(CombatState::hitstun(event.hitstun), tick, wrecker);
        true
    }

    /// Has this fighter been knocked out?
    pub fn is_defeated(&self) -> bool {
        self.health <= 0
    }

    /// Reset the fighter for a fresh round.
    pub fn reset_for_round(
        &mut self,
        spawn: FixedVec2,
        base_health: i32,
        tick: u32,
        wrecker: &mut dyn Wrecker,
    ) {
        self.health = base_health;
        self.body = Body::new(spawn);
        self.force_state(CombatState::Idle, tick, wrecker);
    }

    /// Feed this fighter into a state hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_str(self.team.as_str());
        hasher.update_i32(self.health);
        hasher.update_vec2(self.body.position);
        hasher.update_vec2(self.body.velocity);
        hasher.update_vec2(self.body.facing);
        hasher.update_u32(self.machine.entered_tick());
        self.machine.current().hash_into(hasher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{WALK_SPEED, to_fixed};
    use crate::game::combat::StateKind;
    use crate::game::wreck::ScrapHeap;

    #[test]
    fn test_body_step_moves_and_clamps() {
        let mut body = Body::new(FixedVec2::ZERO);
        body.step(FixedVec2::RIGHT, WALK_SPEED);
        assert!(body.position.x > 0);
        assert_eq!(body.position.y, 0);
        assert_eq!(body.facing.x, crate::core::fixed::FIXED_ONE);

        // Walking into the wall for a long time stays in bounds
        for _ in 0..100_000 {
            body.step(FixedVec2::RIGHT, WALK_SPEED);
        }
        assert_eq!(body.position.x, crate::core::fixed::ARENA_HALF_EXTENT);
    }

    #[test]
    fn test_body_zero_dir_halts() {
        let mut body = Body::new(FixedVec2::ZERO);
        body.step(FixedVec2::RIGHT, WALK_SPEED);
        body.step(FixedVec2::ZERO, WALK_SPEED);
        assert_eq!(body.velocity, FixedVec2::ZERO);
    }

    #[test]
    fn test_receive_hit_applies_damage_and_hitstun() {
        let mut scrap = ScrapHeap::default();
        let mut fighter = Fighter::new(
            EntityId(2),
            Team::new("blue"),
            FixedVec2::ZERO,
            1000,
            MoveSet::default(),
        );

        let event = HitEvent {
            attacker: EntityId(1),
            target: EntityId(2),
            damage: 2,
            hitstun: 30,
            sequence: 17,
        };

        assert!(fighter.receive_hit(&event, 20, &mut scrap));
        assert_eq!(fighter.health, 800);
        match fighter.machine.current() {
            CombatState::Hitstun { remaining } => assert_eq!(*remaining, 30),
            other => panic!("expected hitstun, got {other:?}"),
        }
    }

    #[test]
    fn test_receive_hit_deduplicates() {
        let mut scrap = ScrapHeap::default();
        let mut fighter = Fighter::new(
            EntityId(2),
            Team::new("blue"),
            FixedVec2::ZERO,
            1000,
            MoveSet::default(),
        );

        let event = HitEvent {
            attacker: EntityId(1),
            target: EntityId(2),
            damage: 2,
            hitstun: 30,
            sequence: 17,
        };

        assert!(fighter.receive_hit(&event, 20, &mut scrap));
        // Same logical event re-delivered: ignored
        assert!(!fighter.receive_hit(&event, 21, &mut scrap));
        assert_eq!(fighter.health, 800);

        // A later attack from the same opponent lands
        let next = HitEvent { sequence: 40, ..event };
        assert!(fighter.receive_hit(&next, 45, &mut scrap));
        assert_eq!(fighter.health, 600);
    }

    #[test]
    fn test_hit_overwrites_existing_hitstun() {
        let mut scrap = ScrapHeap::default();
        let mut fighter = Fighter::new(
            EntityId(2),
            Team::new("blue"),
            FixedVec2::ZERO,
            1000,
            MoveSet::default(),
        );

        let first = HitEvent {
            attacker: EntityId(1),
            target: EntityId(2),
            damage: 1,
            hitstun: 50,
            sequence: 10,
        };
        let second = HitEvent {
            attacker: EntityId(3),
            target: EntityId(2),
            damage: 1,
            hitstun: 8,
            sequence: 12,
        };

        fighter.receive_hit(&first, 10, &mut scrap);
        fighter.receive_hit(&second, 12, &mut scrap);

        // Replacement, not refresh arithmetic
        match fighter.machine.current() {
            CombatState::Hitstun { remaining } => assert_eq!(*remaining, 8),
            other => panic!("expected hitstun, got {other:?}"),
        }
        assert_eq!(fighter.health, 800);
    }

    #[test]
    fn test_health_saturates_at_zero() {
        let mut scrap = ScrapHeap::default();
        let mut fighter = Fighter::new(
            EntityId(2),
            Team::new("blue"),
            FixedVec2::ZERO,
            100,
            MoveSet::default(),
        );

        let event = HitEvent {
            attacker: EntityId(1),
            target: EntityId(2),
            damage: 50,
            hitstun: 30,
            sequence: 1,
        };
        fighter.receive_hit(&event, 5, &mut scrap);
        assert_eq!(fighter.health, 0);
        assert!(fighter.is_defeated());
    }

    #[test]
    fn test_reset_for_round() {
        let mut scrap = ScrapHeap::default();
        let mut fighter = Fighter::new(
            EntityId(2),
            Team::new("blue"),
            FixedVec2::ZERO,
            1000,
            MoveSet::default(),
        );
        fighter.health = 0;
        fighter.force_state(CombatState::Defeat, 100, &mut scrap);

        let spawn = FixedVec2::new(to_fixed(3.0), 0);
        fighter.reset_for_round(spawn, 1000, 200, &mut scrap);

        assert_eq!(fighter.health, 1000);
        assert_eq!(fighter.body.position, spawn);
        assert_eq!(fighter.machine.kind(), StateKind::Idle);
    }
}
