//! Entity Registry
//!
//! Maps fighter ids to fighters, split into "all" and "alive". The alive
//! set shrinks monotonically within a round (fighters leave it on defeat)
//! and is reset to the full roster at round start. `alive ⊆ all` holds
//! after every mutation. BTreeMap/BTreeSet keep all iteration deterministic.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::game::fighter::{EntityId, Fighter, Team};

/// Registry of all fighters in a match.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityRegistry {
    all: BTreeMap<EntityId, Fighter>,
    alive: BTreeSet<EntityId>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fighter to both maps.
    pub fn insert(&mut self, fighter: Fighter) {
        self.alive.insert(fighter.id);
        self.all.insert(fighter.id, fighter);
    }

    /// Look up a fighter.
    pub fn get(&self, id: EntityId) -> Option<&Fighter> {
        self.all.get(&id)
    }

    /// Look up a fighter mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Fighter> {
        self.all.get_mut(&id)
    }

    /// Remove a fighter from the alive set.
    ///
    /// Idempotent: removing an absent id is a no-op, logged as a warning,
    /// never an error. Returns whether the fighter was actually removed.
    pub fn remove_from_alive(&mut self, id: EntityId) -> bool {
        let removed = self.alive.remove(&id);
        if !removed {
            warn!(entity = id.0, "remove_from_alive: id not in alive set");
        }
        removed
    }

    /// Remove a fighter from the match entirely (both maps).
    pub fn remove(&mut self, id: EntityId) -> Option<Fighter> {
        self.alive.remove(&id);
        self.all.remove(&id)
    }

    /// Reset the alive set to the full roster (round start).
    pub fn reset_alive(&mut self) {
        self.alive = self.all.keys().copied().collect();
    }

    /// Is this fighter alive?
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    /// Number of fighters in the match.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Number of alive fighters.
    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// All fighter ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.all.keys().copied().collect()
    }

    /// Alive fighter ids in ascending order.
    pub fn alive_ids(&self) -> Vec<EntityId> {
        self.alive.iter().copied().collect()
    }

    /// Iterate all fighters in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Fighter> {
        self.all.values()
    }

    /// Iterate all fighters mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Fighter> {
        self.all.values_mut()
    }

    /// If exactly one team remains among the alive fighters, return it.
    ///
    /// Returns `None` when no fighters are alive or when two or more teams
    /// still stand.
    pub fn single_surviving_team(&self) -> Option<Team> {
        let mut found: Option<&Team> = None;
        for id in &self.alive {
            let fighter = self.all.get(id)?;
            match found {
                None => found = Some(&fighter.team),
                Some(team) if *team != fighter.team => return None,
                Some(_) => {}
            }
        }
        found.cloned()
    }

    /// The alive fighter with the most health.
    ///
    /// Equal health tie-breaks to the lowest id: iteration ascends over
    /// ids and only a strictly greater health displaces the candidate.
    pub fn top_health_alive(&self) -> Option<EntityId> {
        let mut best: Option<(EntityId, i32)> = None;
        for id in &self.alive {
            let fighter = self.all.get(id)?;
            match best {
                None => best = Some((*id, fighter.health)),
                Some((_, health)) if fighter.health > health => {
                    best = Some((*id, fighter.health));
                }
                Some(_) => {}
            }
        }
        best.map(|(id, _)| id)
    }

    /// Does `alive ⊆ all` hold? (Exercised by tests.)
    pub fn invariant_holds(&self) -> bool {
        self.alive.iter().all(|id| self.all.contains_key(id))
    }
}
