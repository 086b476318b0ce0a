//! Combat State Set
//!
//! One variant per combat mode. Each variant knows its entry/exit effects,
//! its per-tick effect, and its transition rule. Transition rules are pure:
//! `handle_input` only reads and returns a decision, all mutation happens in
//! `enter`/`exit`/`tick`. This keeps the rules testable in isolation and
//! transition evaluation reorderable.
//!
//! The rules encode game feel and are documented inline where they are not
//! obvious from the code.

use serde::{Serialize, Deserialize};
use std::fmt;

use crate::core::fixed::{FIXED_ONE, WALK_SPEED, RUN_SPEED};
use crate::core::hash::StateHasher;
use crate::game::animation::Animator;
use crate::game::input::InputSnapshot;
use crate::game::machine::StateCtx;

/// Idle clip / flag name
pub const CLIP_IDLE: &str = "idle";
/// Walk clip / flag name
pub const CLIP_WALK: &str = "walk";
/// Run clip / flag name
pub const CLIP_RUN: &str = "run";
/// Attack clip / flag name
pub const CLIP_ATTACK: &str = "attack";
/// Block clip / flag name
pub const CLIP_BLOCK: &str = "block";
/// Hitstun clip / flag name
pub const CLIP_HITSTUN: &str = "hitstun";
/// Victory clip / flag name
pub const CLIP_VICTORY: &str = "victory";
/// Defeat clip / flag name
pub const CLIP_DEFEAT: &str = "defeat";
/// Lose clip / flag name
pub const CLIP_LOSE: &str = "lose";

// =============================================================================
// MOVE DATA
// =============================================================================

/// Frame data for an attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// First frame (inclusive) on which the hitbox is live
    pub min_active_frame: u32,
    /// Last frame (inclusive) on which the hitbox is live
    pub max_active_frame: u32,
    /// Damage points dealt on hit
    pub damage: u32,
    /// Hitstun ticks inflicted on hit
    pub hitstun: u32,
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self {
            min_active_frame: 3,
            max_active_frame: 7,
            damage: 2,
            hitstun: 30,
        }
    }
}

/// The moves a fighter chassis can perform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSet {
    /// The basic strike
    pub attack: AttackProfile,
}

// =============================================================================
// STATE KIND
// =============================================================================

/// Discriminant-only view of a combat state, for snapshots and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateKind {
    /// Standing neutral
    Idle = 0,
    /// Moving at walk speed
    Walk = 1,
    /// Moving at run speed
    Run = 2,
    /// Strike in progress
    Attack = 3,
    /// Guard raised
    Block = 4,
    /// Staggered by a hit
    Hitstun = 5,
    /// Won the round
    Victory = 6,
    /// Knocked out this round
    Defeat = 7,
    /// Lost the match
    Lose = 8,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Idle => "idle",
            StateKind::Walk => "walk",
            StateKind::Run => "run",
            StateKind::Attack => "attack",
            StateKind::Block => "block",
            StateKind::Hitstun => "hitstun",
            StateKind::Victory => "victory",
            StateKind::Defeat => "defeat",
            StateKind::Lose => "lose",
        };
        f.write_str(name)
    }
}

// =============================================================================
// COMBAT STATE
// =============================================================================

/// One mode of a fighter's combat behavior.
///
/// Exactly one is current per fighter at any tick; the state machine swaps
/// them atomically (exit old, enter new, no further evaluation that tick).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatState {
    /// Standing neutral, waiting for input.
    Idle,
    /// Stick-driven locomotion at walk speed.
    Walk,
    /// Stick-driven locomotion at run speed (trigger held).
    Run,
    /// A strike. `current_frame` counts ticks since entry; the hitbox is
    /// live on the closed interval `[min_active_frame, max_active_frame]`.
    Attack {
        /// Ticks since the attack began
        current_frame: u32,
        /// First live-hitbox frame (inclusive)
        min_active_frame: u32,
        /// Last live-hitbox frame (inclusive)
        max_active_frame: u32,
        /// Damage points dealt on hit
        damage: u32,
        /// Hitstun ticks inflicted on hit
        hitstun: u32,
    },
    /// Guard raised; rides out its animation.
    Block,
    /// Staggered; accepts no input until `remaining` runs out.
    Hitstun {
        /// Stun ticks left
        remaining: u32,
    },
    /// Round won. Terminal for the round.
    Victory,
    /// Knocked out. Terminal for the round.
    Defeat,
    /// Match lost. Terminal; wrecks the chassis on entry.
    Lose,
}

impl CombatState {
    /// Build a fresh attack from frame data.
    pub fn attack_from(profile: AttackProfile) -> Self {
        CombatState::Attack {
            current_frame: 0,
            min_active_frame: profile.min_active_frame,
            max_active_frame: profile.max_active_frame,
            damage: profile.damage,
            hitstun: profile.hitstun,
        }
    }

    /// Build a hitstun state with the given duration.
    pub fn hitstun(remaining: u32) -> Self {
        CombatState::Hitstun { remaining }
    }

    /// Discriminant-only view.
    pub fn kind(&self) -> StateKind {
        match self {
            CombatState::Idle => StateKind::Idle,
            CombatState::Walk => StateKind::Walk,
            CombatState::Run => StateKind::Run,
            CombatState::Attack { .. } => StateKind::Attack,
            CombatState::Block => StateKind::Block,
            CombatState::Hitstun { .. } => StateKind::Hitstun,
            CombatState::Victory => StateKind::Victory,
            CombatState::Defeat => StateKind::Defeat,
            CombatState::Lose => StateKind::Lose,
        }
    }

    /// Is this state terminal for the current round?
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CombatState::Victory | CombatState::Defeat | CombatState::Lose
        )
    }

    /// Transition rule. Pure: reads the animator and input, returns the
    /// next state or `None` for "no transition".
    pub fn handle_input(
        &self,
        anim: &dyn Animator,
        moves: &MoveSet,
        input: &InputSnapshot,
    ) -> Option<CombatState> {
        match self {
            CombatState::Idle => {
                // Hold until the idle clip is confirmed playing, so rules
                // are not evaluated mid-blend.
                if !anim.is_playing(CLIP_IDLE) {
                    return None;
                }

                if input.attack_pressed() {
                    return Some(CombatState::attack_from(moves.attack));
                }
                if input.block_pressed() {
                    return Some(CombatState::Block);
                }

                if !input.beyond_deadzone() {
                    None
                } else if input.run_held() {
                    Some(CombatState::Run)
                } else {
                    Some(CombatState::Walk)
                }
            }

            CombatState::Walk => {
                if input.attack_pressed() {
                    return Some(CombatState::attack_from(moves.attack));
                }
                if input.block_pressed() {
                    return Some(CombatState::Block);
                }

                if !input.beyond_deadzone() {
                    Some(CombatState::Idle)
                } else if input.run_held() {
                    Some(CombatState::Run)
                } else {
                    None
                }
            }

            CombatState::Run => {
                if input.attack_pressed() {
                    return Some(CombatState::attack_from(moves.attack));
                }
                if input.block_pressed() {
                    return Some(CombatState::Block);
                }

                if !input.beyond_deadzone() {
                    Some(CombatState::Idle)
                } else if !input.run_held() {
                    Some(CombatState::Walk)
                } else {
                    None
                }
            }

            CombatState::Attack { .. } => {
                // Input is ignored entirely. The attack self-terminates once
                // its clip reports completion - but only if that clip is
                // confirmed currently playing, so a stale completion reading
                // after an external interrupt cannot end the wrong state.
                if !anim.is_playing(CLIP_ATTACK) {
                    return None;
                }

                if anim.normalized_time(0) > FIXED_ONE && !anim.in_transition(0) {
                    Some(CombatState::Idle)
                } else {
                    None
                }
            }

            CombatState::Block => {
                // Same exit discipline as Attack, against the block clip.
                if !anim.is_playing(CLIP_BLOCK) {
                    return None;
                }

                if anim.normalized_time(0) > FIXED_ONE && !anim.in_transition(0) {
                    Some(CombatState::Idle)
                } else {
                    None
                }
            }

            CombatState::Hitstun { remaining } => {
                if *remaining == 0 {
                    Some(CombatState::Idle)
                } else {
                    None
                }
            }

            CombatState::Victory | CombatState::Defeat | CombatState::Lose => None,
        }
    }

    /// Entry effect.
    pub fn enter(&self, ctx: &mut StateCtx<'_>) {
        match self {
            CombatState::Idle => {
                ctx.body.halt();
                ctx.animator.set_flag(CLIP_WALK, false);
                ctx.animator.set_flag(CLIP_RUN, false);
            }
            CombatState::Walk => ctx.animator.set_flag(CLIP_WALK, true),
            CombatState::Run => ctx.animator.set_flag(CLIP_RUN, true),
            CombatState::Attack { .. } => {
                ctx.body.halt();
                ctx.animator.set_flag(CLIP_ATTACK, true);
            }
            CombatState::Block => {
                ctx.body.halt();
                ctx.animator.set_flag(CLIP_BLOCK, true);
            }
            CombatState::Hitstun { .. } => {
                ctx.body.halt();
                ctx.animator.set_flag(CLIP_HITSTUN, true);
            }
            CombatState::Victory => {
                ctx.body.halt();
                ctx.animator.set_flag(CLIP_VICTORY, true);
            }
            CombatState::Defeat => {
                ctx.body.halt();
                ctx.animator.set_flag(CLIP_DEFEAT, true);
            }
            CombatState::Lose => {
                ctx.body.halt();
                ctx.animator.set_flag(CLIP_LOSE, true);

                // Destructive cosmetic effect; a missing remains prop must
                // never take the state machine down with it.
                if let Err(err) = ctx.wrecker.wreck(ctx.entity) {
                    tracing::error!(entity = ctx.entity.0, %err, "failed to wreck chassis");
                }
            }
        }
    }

    /// Exit effect.
    pub fn exit(&self, ctx: &mut StateCtx<'_>) {
        match self {
            CombatState::Idle => {}
            CombatState::Walk => ctx.animator.set_flag(CLIP_WALK, false),
            CombatState::Run => ctx.animator.set_flag(CLIP_RUN, false),
            CombatState::Attack { .. } => ctx.animator.set_flag(CLIP_ATTACK, false),
            CombatState::Block => ctx.animator.set_flag(CLIP_BLOCK, false),
            CombatState::Hitstun { .. } => ctx.animator.set_flag(CLIP_HITSTUN, false),
            CombatState::Victory => ctx.animator.set_flag(CLIP_VICTORY, false),
            CombatState::Defeat => ctx.animator.set_flag(CLIP_DEFEAT, false),
            CombatState::Lose => ctx.animator.set_flag(CLIP_LOSE, false),
        }
    }

    /// Per-tick effect. Runs only on ticks where no transition fired.
    pub fn tick(&mut self, ctx: &mut StateCtx<'_>, input: &InputSnapshot) {
        match self {
            CombatState::Walk => ctx.body.step(input.stick(), WALK_SPEED),
            CombatState::Run => ctx.body.step(input.stick(), RUN_SPEED),
            CombatState::Attack { current_frame, .. } => {
                *current_frame = current_frame.saturating_add(1);
            }
            CombatState::Hitstun { remaining } => {
                *remaining = remaining.saturating_sub(1);
            }
            _ => {}
        }
    }

    /// Feed the state into a hasher (kind tag plus variant payload).
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.kind() as u8);
        match self {
            CombatState::Attack {
                current_frame,
                min_active_frame,
                max_active_frame,
                damage,
                hitstun,
            } => {
                hasher.update_u32(*current_frame);
                hasher.update_u32(*min_active_frame);
                hasher.update_u32(*max_active_frame);
                hasher.update_u32(*damage);
                hasher.update_u32(*hitstun);
            }
            CombatState::Hitstun { remaining } => hasher.update_u32(*remaining),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::{ClipAnimator, BLEND_TICKS};

    fn confirmed(clip: &str) -> ClipAnimator {
        let mut anim = ClipAnimator::new();
        if clip != CLIP_IDLE {
            anim.set_flag(clip, true);
            for _ in 0..BLEND_TICKS {
                anim.advance();
            }
        }
        anim
    }

    fn attack_input() -> InputSnapshot {
        let mut input = InputSnapshot::new();
        input.set_attack(true);
        input
    }

    #[test]
    fn test_idle_to_attack_on_edge() {
        let anim = confirmed(CLIP_IDLE);
        let moves = MoveSet::default();

        let next = CombatState::Idle.handle_input(&anim, &moves, &attack_input());
        match next {
            Some(CombatState::Attack { current_frame, min_active_frame, .. }) => {
                assert_eq!(current_frame, 0);
                assert_eq!(min_active_frame, moves.attack.min_active_frame);
            }
            other => panic!("expected attack, got {other:?}"),
        }
    }

    #[test]
    fn test_idle_to_block_on_edge() {
        let anim = confirmed(CLIP_IDLE);
        let mut input = InputSnapshot::new();
        input.set_block(true);

        let next = CombatState::Idle.handle_input(&anim, &MoveSet::default(), &input);
        assert_eq!(next, Some(CombatState::Block));
    }

    #[test]
    fn test_idle_movement_thresholds() {
        let anim = confirmed(CLIP_IDLE);
        let moves = MoveSet::default();

        // Inside the deadzone: no transition
        let next = CombatState::Idle.handle_input(&anim, &moves, &InputSnapshot::with_stick(20, 20));
        assert_eq!(next, None);

        // Beyond the deadzone: walk
        let next = CombatState::Idle.handle_input(&anim, &moves, &InputSnapshot::with_stick(60, 0));
        assert_eq!(next, Some(CombatState::Walk));

        // Beyond the deadzone with trigger held: run
        let mut input = InputSnapshot::with_stick(60, 0);
        input.set_run(true);
        let next = CombatState::Idle.handle_input(&anim, &moves, &input);
        assert_eq!(next, Some(CombatState::Run));
    }

    #[test]
    fn test_idle_holds_while_unconfirmed() {
        // Animator still blending toward idle: the clip is not confirmed
        let mut anim = ClipAnimator::new();
        anim.set_flag(CLIP_WALK, true);
        for _ in 0..BLEND_TICKS {
            anim.advance();
        }
        anim.set_flag(CLIP_WALK, false); // blending walk -> idle now

        let next = CombatState::Idle.handle_input(&anim, &MoveSet::default(), &attack_input());
        assert_eq!(next, None, "rules must not fire mid-blend");
    }

    #[test]
    fn test_walk_back_to_idle_and_up_to_run() {
        let anim = confirmed(CLIP_WALK);
        let moves = MoveSet::default();

        let next = CombatState::Walk.handle_input(&anim, &moves, &InputSnapshot::new());
        assert_eq!(next, Some(CombatState::Idle));

        let mut input = InputSnapshot::with_stick(80, 0);
        input.set_run(true);
        let next = CombatState::Walk.handle_input(&anim, &moves, &input);
        assert_eq!(next, Some(CombatState::Run));

        // Still moving, no trigger: stay walking
        let next = CombatState::Walk.handle_input(&anim, &moves, &InputSnapshot::with_stick(80, 0));
        assert_eq!(next, None);
    }

    #[test]
    fn test_run_downshifts() {
        let anim = confirmed(CLIP_RUN);
        let moves = MoveSet::default();

        // Trigger released while moving: walk
        let next = CombatState::Run.handle_input(&anim, &moves, &InputSnapshot::with_stick(80, 0));
        assert_eq!(next, Some(CombatState::Walk));

        // Stick released: idle
        let next = CombatState::Run.handle_input(&anim, &moves, &InputSnapshot::new());
        assert_eq!(next, Some(CombatState::Idle));
    }

    #[test]
    fn test_attack_ignores_input_until_clip_completes() {
        let mut anim = confirmed(CLIP_ATTACK);
        anim.set_clip_ticks(CLIP_ATTACK, 10);
        let moves = MoveSet::default();
        let state = CombatState::attack_from(moves.attack);

        // Mid-clip: mashing buttons does nothing
        let next = state.handle_input(&anim, &moves, &attack_input());
        assert_eq!(next, None);

        // Run the clip past its end
        let mut anim = confirmed(CLIP_ATTACK);
        anim.set_clip_ticks(CLIP_ATTACK, 10);
        for _ in 0..12 {
            anim.advance();
        }
        let next = state.handle_input(&anim, &moves, &InputSnapshot::new());
        assert_eq!(next, Some(CombatState::Idle));
    }

    #[test]
    fn test_attack_completion_needs_confirmed_clip() {
        // The attack clip never starts playing (e.g. desynchronized layer):
        // the state holds forever. That is the intended wait-for-animation
        // semantics, not a timeout.
        let anim = ClipAnimator::new(); // still in idle
        let moves = MoveSet::default();
        let state = CombatState::attack_from(moves.attack);

        let next = state.handle_input(&anim, &moves, &InputSnapshot::new());
        assert_eq!(next, None);
    }

    #[test]
    fn test_hitstun_releases_only_at_zero() {
        let anim = confirmed(CLIP_HITSTUN);
        let moves = MoveSet::default();

        let held = CombatState::hitstun(3);
        assert_eq!(held.handle_input(&anim, &moves, &attack_input()), None);

        let done = CombatState::hitstun(0);
        assert_eq!(
            done.handle_input(&anim, &moves, &InputSnapshot::new()),
            Some(CombatState::Idle)
        );
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let anim = confirmed(CLIP_IDLE);
        let moves = MoveSet::default();
        let input = attack_input();

        assert_eq!(CombatState::Victory.handle_input(&anim, &moves, &input), None);
        assert_eq!(CombatState::Defeat.handle_input(&anim, &moves, &input), None);
        assert_eq!(CombatState::Lose.handle_input(&anim, &moves, &input), None);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(CombatState::Idle.kind(), StateKind::Idle);
        assert_eq!(
            CombatState::attack_from(AttackProfile::default()).kind(),
            StateKind::Attack
        );
        assert_eq!(CombatState::hitstun(5).kind(), StateKind::Hitstun);
        assert!(CombatState::Lose.is_terminal());
        assert!(!CombatState::Walk.is_terminal());
    }
}
