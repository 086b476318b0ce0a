//! Round Control
//!
//! Observes the registry and the round clock, decides round and match
//! termination, and pushes the terminal state transitions (Victory, Defeat,
//! Lose) onto the affected fighters. Round-advance and arena-exit are
//! cooperative delays: tick-counted actions that can be aborted if a new
//! round condition supersedes them before they fire.

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::game::authority::Authority;
use crate::game::combat::CombatState;
use crate::game::events::GameEvent;
use crate::game::fighter::EntityId;
use crate::game::registry::EntityRegistry;
use crate::game::scoreboard::Scoreboard;
use crate::game::wreck::Wrecker;

/// The round clock. Polled, never interrupt-driven.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundTimer {
    duration: u32,
    remaining: u32,
    started: bool,
}

impl RoundTimer {
    /// Create a stopped timer with the given round duration in ticks.
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            remaining: duration,
            started: false,
        }
    }

    /// Has the timer been started for this round?
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Ticks left on the clock.
    pub fn remaining_ticks(&self) -> u32 {
        self.remaining
    }

    /// Start the clock.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Rewind to a full round and stop.
    pub fn reset_for_round(&mut self) {
        self.remaining = self.duration;
        self.started = false;
    }

    /// Advance the clock one tick.
    pub fn tick_down(&mut self) {
        if self.started {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    /// Has a started clock run out?
    pub fn elapsed(&self) -> bool {
        self.started && self.remaining == 0
    }
}

/// What a delayed action does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Reset the arena for the next round
    NextRound,
    /// Tear the match down and leave the arena
    LeaveArena,
}

/// A cooperative delay: fires after `fires_in` polls unless cancelled or
/// superseded first.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DelayedAction {
    /// What fires
    pub kind: ActionKind,
    /// Polls until it fires
    pub fires_in: u32,
}

/// Round and match termination logic for one arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundController {
    /// The round clock
    pub timer: RoundTimer,
    /// Team win tally
    pub scoreboard: Scoreboard,
    /// Set when the current round has concluded
    pub round_finished: bool,
    /// Terminal: set when a team has taken the match
    pub match_finished: bool,
    next_round_delay: u32,
    leave_delay: u32,
    pending: Option<DelayedAction>,
}

impl RoundController {
    /// Create a controller.
    pub fn new(
        round_ticks: u32,
        wins_to_take_match: u32,
        next_round_delay: u32,
        leave_delay: u32,
    ) -> Self {
        Self {
            timer: RoundTimer::new(round_ticks),
            scoreboard: Scoreboard::new(wins_to_take_match),
            round_finished: false,
            match_finished: false,
            next_round_delay,
            leave_delay,
            pending: None,
        }
    }

    /// Start a fresh round: clear the round flag, abort any pending delay
    /// (a round already restarting invalidates it), rewind and start the
    /// clock.
    pub fn begin_round(&mut self) {
        self.round_finished = false;
        self.cancel_pending();
        self.timer.reset_for_round();
        self.timer.start();
    }

    /// The currently scheduled delayed action, if any.
    pub fn pending_action(&self) -> Option<&DelayedAction> {
        self.pending.as_ref()
    }

    /// Abort the pending delayed action before it fires.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    fn schedule(&mut self, kind: ActionKind, fires_in: u32) {
        self.pending = Some(DelayedAction { kind, fires_in });
    }

    /// Process a knockout: drop the victim from the alive set, put them in
    /// Defeat, and end the round if only one team still stands.
    ///
    /// Idempotent per victim - a repeated knockout report is a logged
    /// no-op.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_defeat(
        &mut self,
        registry: &mut EntityRegistry,
        authority: &Authority,
        victim: EntityId,
        round: u32,
        tick: u32,
        wrecker: &mut dyn Wrecker,
        events: &mut Vec<GameEvent>,
    ) {
        if !registry.remove_from_alive(victim) {
            return;
        }

        let Some(fighter) = registry.get_mut(victim) else {
            return;
        };
        let team = fighter.team.clone();
        fighter.force_state(CombatState::Defeat, tick, wrecker);
        info!(entity = victim.0, team = %team, tick, "fighter knocked out");
        events.push(GameEvent::fighter_defeated(tick, victim, team));

        if self.round_finished || self.match_finished {
            return;
        }

        if let Some(winning) = registry.single_surviving_team() {
            for id in registry.alive_ids() {
                if !authority.is_local(id) {
                    continue;
                }
                if let Some(survivor) = registry.get_mut(id) {
                    survivor.force_state(CombatState::Victory, tick, wrecker);
                }
            }
            self.end_round(Some(winning), registry, authority, round, tick, wrecker, events);
        } else if registry.alive_count() == 0 {
            // Double knockout: the round concludes without a victor
            self.end_round(None, registry, authority, round, tick, wrecker, events);
        }
    }

    /// Per-tick poll: advance the clock, resolve a timeout, schedule and
    /// fire delayed actions. Returns an action the moment it fires.
    pub fn poll(
        &mut self,
        registry: &mut EntityRegistry,
        authority: &Authority,
        round: u32,
        tick: u32,
        wrecker: &mut dyn Wrecker,
        events: &mut Vec<GameEvent>,
    ) -> Option<ActionKind> {
        if !self.round_finished && !self.match_finished {
            self.timer.tick_down();
            if self.timer.elapsed() {
                self.timeout_ending(registry, authority, round, tick, wrecker, events);
            }
        }

        if self.match_finished {
            let leaving = matches!(
                self.pending,
                Some(DelayedAction { kind: ActionKind::LeaveArena, .. })
            );
            if !leaving {
                // Supersedes any queued round-advance
                self.schedule(ActionKind::LeaveArena, self.leave_delay);
            }
        } else if self.round_finished && self.pending.is_none() {
            self.schedule(ActionKind::NextRound, self.next_round_delay);
        }

        if matches!(self.pending, Some(DelayedAction { fires_in: 0, .. })) {
            return self.pending.take().map(|action| action.kind);
        }
        if let Some(pending) = &mut self.pending {
            pending.fires_in -= 1;
        }

        None
    }

    /// The clock ran out: award the round to the team of the healthiest
    /// alive fighter. Equal health tie-breaks to the lowest fighter id.
    fn timeout_ending(
        &mut self,
        registry: &mut EntityRegistry,
        authority: &Authority,
        round: u32,
        tick: u32,
        wrecker: &mut dyn Wrecker,
        events: &mut Vec<GameEvent>,
    ) {
        match registry.top_health_alive() {
            Some(winner_id) => {
                let Some(team) = registry.get(winner_id).map(|f| f.team.clone()) else {
                    return;
                };
                info!(entity = winner_id.0, team = %team, "round timeout, awarding to healthiest fighter");
                if authority.is_local(winner_id) {
                    if let Some(winner) = registry.get_mut(winner_id) {
                        winner.force_state(CombatState::Victory, tick, wrecker);
                    }
                }
                self.end_round(Some(team), registry, authority, round, tick, wrecker, events);
            }
            None => {
                self.end_round(None, registry, authority, round, tick, wrecker, events);
            }
        }
    }

    /// Round bookkeeping: tally the win, raise the round flag, and if the
    /// tally takes the match, raise the match flag and wreck the losers.
    #[allow(clippy::too_many_arguments)]
    fn end_round(
        &mut self,
        winner: Option<crate::game::fighter::Team>,
        registry: &mut EntityRegistry,
        authority: &Authority,
        round: u32,
        tick: u32,
        wrecker: &mut dyn Wrecker,
        events: &mut Vec<GameEvent>,
    ) {
        self.round_finished = true;

        let wins = match &winner {
            Some(team) => self.scoreboard.add_victory(team),
            None => 0,
        };

        match &winner {
            Some(team) => info!(round, team = %team, wins, "round ended"),
            None => info!(round, "round ended in a draw"),
        }
        events.push(GameEvent::round_ended(tick, round, winner.clone(), wins));

        let Some(team) = winner else {
            return;
        };

        if self.scoreboard.check_for_match_victory() {
            self.match_finished = true;
            self.cancel_pending();
            info!(team = %team, "match ended");
            events.push(GameEvent::match_ended(tick, team.clone()));

            for id in registry.ids() {
                if !authority.is_local(id) {
                    continue;
                }
                if let Some(fighter) = registry.get_mut(id) {
                    if fighter.team != team {
                        fighter.force_state(CombatState::Lose, tick, wrecker);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::FixedVec2;
    use crate::game::combat::{MoveSet, StateKind};
    use crate::game::fighter::{Fighter, Team};
    use crate::game::wreck::ScrapHeap;

    fn fighter(id: u32, team: &str, health: i32) -> Fighter {
        let mut f = Fighter::new(
            EntityId(id),
            Team::new(team),
            FixedVec2::ZERO,
            1000,
            MoveSet::default(),
        );
        f.health = health;
        f
    }

    fn rig(fighters: Vec<Fighter>) -> (EntityRegistry, Authority, ScrapHeap, Vec<GameEvent>) {
        let mut reg = EntityRegistry::new();
        let ids: Vec<EntityId> = fighters.iter().map(|f| f.id).collect();
        for f in fighters {
            reg.insert(f);
        }
        (reg, Authority::host_of(ids), ScrapHeap::default(), Vec::new())
    }

    #[test]
    fn test_last_team_standing_victory() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 900),
            fighter(2, "red", 500),
            fighter(3, "blue", 0),
        ]);
        let mut ctl = RoundController::new(3600, 2, 300, 180);
        ctl.begin_round();

        ctl.handle_defeat(&mut reg, &auth, EntityId(3), 1, 100, &mut scrap, &mut events);

        assert!(ctl.round_finished);
        assert_eq!(reg.get(EntityId(3)).unwrap().machine.kind(), StateKind::Defeat);
        assert_eq!(reg.get(EntityId(1)).unwrap().machine.kind(), StateKind::Victory);
        assert_eq!(reg.get(EntityId(2)).unwrap().machine.kind(), StateKind::Victory);
        assert_eq!(ctl.scoreboard.wins(&Team::new("red")), 1);
    }

    #[test]
    fn test_defeat_with_two_teams_left_does_not_end_round() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 900),
            fighter(2, "blue", 500),
            fighter(3, "blue", 600),
        ]);
        let mut ctl = RoundController::new(3600, 2, 300, 180);
        ctl.begin_round();

        ctl.handle_defeat(&mut reg, &auth, EntityId(3), 1, 100, &mut scrap, &mut events);

        // red and blue both still stand
        assert!(!ctl.round_finished);
        assert_eq!(reg.get(EntityId(1)).unwrap().machine.kind(), StateKind::Idle);
    }

    #[test]
    fn test_repeated_defeat_is_noop() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 900),
            fighter(2, "blue", 500),
        ]);
        let mut ctl = RoundController::new(3600, 2, 300, 180);
        ctl.begin_round();

        ctl.handle_defeat(&mut reg, &auth, EntityId(2), 1, 100, &mut scrap, &mut events);
        let wins_after_first = ctl.scoreboard.wins(&Team::new("red"));

        ctl.handle_defeat(&mut reg, &auth, EntityId(2), 1, 101, &mut scrap, &mut events);
        assert_eq!(ctl.scoreboard.wins(&Team::new("red")), wins_after_first);
    }

    #[test]
    fn test_timeout_awards_healthiest_with_id_tiebreak() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 700),
            fighter(2, "blue", 700),
            fighter(3, "red", 400),
        ]);
        let mut ctl = RoundController::new(5, 2, 300, 180);
        ctl.begin_round();

        // Run the clock out
        let mut fired = None;
        for t in 1..=10 {
            fired = ctl.poll(&mut reg, &auth, 1, t, &mut scrap, &mut events);
            if ctl.round_finished {
                break;
            }
        }
        assert!(fired.is_none());
        assert!(ctl.round_finished);

        // 1 and 2 tie at 700; lowest id (1, team red) takes the round
        assert_eq!(reg.get(EntityId(1)).unwrap().machine.kind(), StateKind::Victory);
        assert_eq!(ctl.scoreboard.wins(&Team::new("red")), 1);
        assert_eq!(ctl.scoreboard.wins(&Team::new("blue")), 0);
    }

    #[test]
    fn test_round_end_schedules_next_round_and_begin_cancels() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 900),
            fighter(2, "blue", 0),
        ]);
        let mut ctl = RoundController::new(3600, 2, 10, 180);
        ctl.begin_round();

        ctl.handle_defeat(&mut reg, &auth, EntityId(2), 1, 50, &mut scrap, &mut events);
        assert!(ctl.round_finished);

        // Next poll schedules the round advance
        ctl.poll(&mut reg, &auth, 1, 51, &mut scrap, &mut events);
        assert_eq!(ctl.pending_action().map(|a| a.kind), Some(ActionKind::NextRound));

        // A round restarting through other means aborts the delay
        ctl.begin_round();
        assert!(ctl.pending_action().is_none());
    }

    #[test]
    fn test_delayed_action_fires_after_delay() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 900),
            fighter(2, "blue", 0),
        ]);
        let mut ctl = RoundController::new(3600, 2, 3, 180);
        ctl.begin_round();
        ctl.handle_defeat(&mut reg, &auth, EntityId(2), 1, 50, &mut scrap, &mut events);

        let mut fired = None;
        let mut polls = 0;
        for t in 51..100 {
            polls += 1;
            fired = ctl.poll(&mut reg, &auth, 1, t, &mut scrap, &mut events);
            if fired.is_some() {
                break;
            }
        }
        assert_eq!(fired, Some(ActionKind::NextRound));
        assert_eq!(polls, 4); // scheduling poll counts down too, then 2 more, then the firing poll
    }

    #[test]
    fn test_match_finish_wrecks_losers_and_schedules_leave() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 900),
            fighter(2, "blue", 0),
        ]);
        // Single round takes the match
        let mut ctl = RoundController::new(3600, 1, 300, 2);
        ctl.begin_round();

        ctl.handle_defeat(&mut reg, &auth, EntityId(2), 1, 50, &mut scrap, &mut events);
        assert!(ctl.match_finished);
        assert_eq!(reg.get(EntityId(2)).unwrap().machine.kind(), StateKind::Lose);
        assert!(scrap.is_wrecked(EntityId(2)));
        assert!(!scrap.is_wrecked(EntityId(1)));

        let mut fired = None;
        for t in 51..100 {
            fired = ctl.poll(&mut reg, &auth, 1, t, &mut scrap, &mut events);
            if fired.is_some() {
                break;
            }
        }
        assert_eq!(fired, Some(ActionKind::LeaveArena));
    }

    #[test]
    fn test_double_knockout_is_a_draw() {
        let (mut reg, auth, mut scrap, mut events) = rig(vec![
            fighter(1, "red", 0),
            fighter(2, "blue", 0),
        ]);
        let mut ctl = RoundController::new(3600, 2, 300, 180);
        ctl.begin_round();

        ctl.handle_defeat(&mut reg, &auth, EntityId(1), 1, 50, &mut scrap, &mut events);
        assert!(!ctl.round_finished);
        ctl.handle_defeat(&mut reg, &auth, EntityId(2), 1, 50, &mut scrap, &mut events);

        assert!(ctl.round_finished);
        assert_eq!(ctl.scoreboard.wins(&Team::new("red")), 0);
        assert_eq!(ctl.scoreboard.wins(&Team::new("blue")), 0);
    }
}
