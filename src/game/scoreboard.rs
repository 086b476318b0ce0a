//! Scoreboard
//!
//! Team win tally and the match win condition. Presentation of scores
//! belongs to clients; this is only the authoritative count.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::game::fighter::Team;

/// Rounds a team must take to win the match.
pub const DEFAULT_WINS_TO_TAKE_MATCH: u32 = 2;

/// Authoritative team win tally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scoreboard {
    wins: BTreeMap<Team, u32>,
    wins_to_take_match: u32,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new(DEFAULT_WINS_TO_TAKE_MATCH)
    }
}

impl Scoreboard {
    /// Create a scoreboard with the given win threshold.
    pub fn new(wins_to_take_match: u32) -> Self {
        Self {
            wins: BTreeMap::new(),
            wins_to_take_match: wins_to_take_match.max(1),
        }
    }

    /// Record a round win. Returns the team's new tally.
    pub fn add_victory(&mut self, team: &Team) -> u32 {
        let tally = self.wins.entry(team.clone()).or_insert(0);
        *tally += 1;
        *tally
    }

    /// Wins recorded for a team.
    pub fn wins(&self, team: &Team) -> u32 {
        self.wins.get(team).copied().unwrap_or(0)
    }

    /// Has any team reached the match win threshold?
    pub fn check_for_match_victory(&self) -> bool {
        self.match_winner().is_some()
    }

    /// The team that has taken the match, if any.
    pub fn match_winner(&self) -> Option<&Team> {
        self.wins
            .iter()
            .find(|(_, &w)| w >= self.wins_to_take_match)
            .map(|(team, _)| team)
    }

    /// All tallies in team order.
    pub fn standings(&self) -> impl Iterator<Item = (&Team, u32)> {
        self.wins.iter().map(|(team, &w)| (team, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_accumulates() {
        let mut scores = Scoreboard::new(3);
        let red = Team::new("red");

        assert_eq!(scores.wins(&red), 0);
        assert_eq!(scores.add_victory(&red), 1);
        assert_eq!(scores.add_victory(&red), 2);
        assert_eq!(scores.wins(&red), 2);
    }

    #[test]
    fn test_match_victory_threshold() {
        let mut scores = Scoreboard::new(2);
        let red = Team::new("red");
        let blue = Team::new("blue");

        scores.add_victory(&red);
        scores.add_victory(&blue);
        assert!(!scores.check_for_match_victory());

        scores.add_victory(&blue);
        assert!(scores.check_for_match_victory());
        assert_eq!(scores.match_winner(), Some(&blue));
    }

    #[test]
    fn test_threshold_floor_is_one() {
        let mut scores = Scoreboard::new(0);
        scores.add_victory(&Team::new("red"));
        assert!(scores.check_for_match_victory());
    }
}
