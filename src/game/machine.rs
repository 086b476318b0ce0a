//! Combat State Machine
//!
//! Owns the single current combat state of one fighter and drives its
//! lifecycle: exit the old state, enter the new one, at most one transition
//! per tick. The prior state is discarded on transition, never pooled.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::game::animation::Animator;
use crate::game::combat::{CombatState, MoveSet, StateKind};
use crate::game::fighter::{Body, EntityId};
use crate::game::input::InputSnapshot;
use crate::game::wreck::Wrecker;

/// Everything a state's entry/exit/tick effects may touch.
///
/// `handle_input` sees only the animator (read-only); mutation is reserved
/// for the lifecycle hooks.
pub struct StateCtx<'a> {
    /// Fighter the machine belongs to
    pub entity: EntityId,
    /// Current simulation tick
    pub tick: u32,
    /// The fighter's locomotion body
    pub body: &'a mut Body,
    /// The fighter's animation collaborator
    pub animator: &'a mut dyn Animator,
    /// The wreck side-effect collaborator
    pub wrecker: &'a mut dyn Wrecker,
}

/// State machine for one fighter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateMachine {
    current: CombatState,
    entered_tick: u32,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a machine resting in Idle.
    pub fn new() -> Self {
        Self {
            current: CombatState::Idle,
            entered_tick: 0,
        }
    }

    /// The current combat state.
    pub fn current(&self) -> &CombatState {
        &self.current
    }

    /// Discriminant of the current state.
    pub fn kind(&self) -> StateKind {
        self.current.kind()
    }

    /// Tick on which the current state was entered. Doubles as the
    /// per-attack sequence number for hit de-duplication.
    pub fn entered_tick(&self) -> u32 {
        self.entered_tick
    }

    /// Replace the current state: exit the old, enter the new.
    pub fn set_state(&mut self, next: CombatState, ctx: &mut StateCtx<'_>) {
        debug!(
            entity = ctx.entity.0,
            from = %self.current.kind(),
            to = %next.kind(),
            tick = ctx.tick,
            "state transition"
        );

        self.current.exit(ctx);
        self.current = next;
        self.entered_tick = ctx.tick;
        self.current.enter(ctx);
    }

    /// Drive one tick: evaluate the transition rule, commit at most one
    /// transition, otherwise run the state's per-tick effect.
    pub fn update(&mut self, ctx: &mut StateCtx<'_>, moves: &MoveSet, input: &InputSnapshot) {
        let decision = self.current.handle_input(&*ctx.animator, moves, input);

        if let Some(next) = decision {
            self.set_state(next, ctx);
        } else {
            self.current.tick(ctx, input);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::FixedVec2;
    use crate::game::animation::{ClipAnimator, BLEND_TICKS};
    use crate::game::combat::{AttackProfile, CLIP_WALK};
    use crate::game::wreck::ScrapHeap;

    struct Rig {
        body: Body,
        animator: ClipAnimator,
        scrap: ScrapHeap,
        machine: StateMachine,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                body: Body::new(FixedVec2::ZERO),
                animator: ClipAnimator::new(),
                scrap: ScrapHeap::default(),
                machine: StateMachine::new(),
            }
        }

        fn update(&mut self, tick: u32, input: &InputSnapshot) {
            let mut ctx = StateCtx {
                entity: EntityId(1),
                tick,
                body: &mut self.body,
                animator: &mut self.animator,
                wrecker: &mut self.scrap,
            };
            self.machine.update(&mut ctx, &MoveSet::default(), input);
        }

        fn force(&mut self, tick: u32, state: CombatState) {
            let mut ctx = StateCtx {
                entity: EntityId(1),
                tick,
                body: &mut self.body,
                animator: &mut self.animator,
                wrecker: &mut self.scrap,
            };
            self.machine.set_state(state, &mut ctx);
        }
    }

    #[test]
    fn test_one_transition_per_update() {
        let mut rig = Rig::new();

        // Stick hard over: idle -> walk, but no further that same update
        let input = InputSnapshot::with_stick(100, 0);
        rig.update(1, &input);
        assert_eq!(rig.machine.kind(), StateKind::Walk);
        assert_eq!(rig.machine.entered_tick(), 1);
    }

    /// Animator that records every flag write, so transition ordering is
    /// observable.
    #[derive(Default)]
    struct TraceAnimator {
        writes: Vec<(String, bool)>,
    }

    impl Animator for TraceAnimator {
        fn is_playing(&self, _clip: &str) -> bool {
            true
        }
        fn normalized_time(&self, _layer: usize) -> crate::core::fixed::Fixed {
            0
        }
        fn in_transition(&self, _layer: usize) -> bool {
            false
        }
        fn set_flag(&mut self, name: &str, value: bool) {
            self.writes.push((name.to_string(), value));
        }
    }

    #[test]
    fn test_exit_runs_before_enter_across_transitions() {
        let mut body = Body::new(FixedVec2::ZERO);
        let mut animator = TraceAnimator::default();
        let mut scrap = ScrapHeap::default();
        let mut machine = StateMachine::new();

        for (tick, state) in [
            (1, CombatState::Walk),
            (2, CombatState::Run),
            (3, CombatState::Idle),
        ] {
            let mut ctx = StateCtx {
                entity: EntityId(1),
                tick,
                body: &mut body,
                animator: &mut animator,
                wrecker: &mut scrap,
            };
            machine.set_state(state, &mut ctx);
        }

        // Walk enters; then walk exits before run enters; then run exits
        // before idle enters (which also clears locomotion flags).
        assert_eq!(
            animator.writes,
            vec![
                ("walk".to_string(), true),
                ("walk".to_string(), false),
                ("run".to_string(), true),
                ("run".to_string(), false),
                ("walk".to_string(), false),
                ("run".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_exit_before_enter_flag_ordering() {
        let mut rig = Rig::new();
        rig.update(1, &InputSnapshot::with_stick(100, 0));
        assert!(rig.animator.flag(CLIP_WALK));

        // Walk -> idle must clear the walk flag (exit) before idle's enter
        rig.update(2, &InputSnapshot::new());
        assert_eq!(rig.machine.kind(), StateKind::Idle);
        assert!(!rig.animator.flag(CLIP_WALK));
    }

    #[test]
    fn test_tick_runs_only_without_transition() {
        let mut rig = Rig::new();
        rig.force(1, CombatState::attack_from(AttackProfile::default()));

        // The attack clip is still blending in, so no transition fires and
        // the frame counter advances each update.
        rig.update(2, &InputSnapshot::new());
        rig.update(3, &InputSnapshot::new());
        match rig.machine.current() {
            CombatState::Attack { current_frame, .. } => assert_eq!(*current_frame, 2),
            other => panic!("expected attack, got {other:?}"),
        }
    }

    #[test]
    fn test_hitstun_duration_is_exact() {
        let mut rig = Rig::new();
        rig.force(1, CombatState::hitstun(3));

        // Three updates in stun, release on the fourth
        for t in 2..=4 {
            rig.update(t, &InputSnapshot::new());
            assert_eq!(rig.machine.kind(), StateKind::Hitstun, "tick {t}");
        }
        rig.update(5, &InputSnapshot::new());
        assert_eq!(rig.machine.kind(), StateKind::Idle);
    }

    #[test]
    fn test_forced_state_overwrites_current() {
        let mut rig = Rig::new();
        rig.force(1, CombatState::hitstun(30));
        assert_eq!(rig.machine.kind(), StateKind::Hitstun);

        // A second hit replaces the stun outright - no stacking
        rig.force(2, CombatState::hitstun(10));
        match rig.machine.current() {
            CombatState::Hitstun { remaining } => assert_eq!(*remaining, 10),
            other => panic!("expected hitstun, got {other:?}"),
        }
        assert_eq!(rig.machine.entered_tick(), 2);
    }

    #[test]
    fn test_attack_full_lifecycle() {
        let mut rig = Rig::new();
        rig.animator.set_clip_ticks("attack", 8);

        let mut input = InputSnapshot::new();
        input.set_attack(true);
        rig.update(1, &input);
        assert_eq!(rig.machine.kind(), StateKind::Attack);

        // Drive animator and machine until the clip runs out
        let neutral = InputSnapshot::new();
        for t in 2..(2 + BLEND_TICKS + 8 + 3) {
            rig.animator.advance();
            rig.update(t, &neutral);
        }
        assert_eq!(rig.machine.kind(), StateKind::Idle);
    }
}
