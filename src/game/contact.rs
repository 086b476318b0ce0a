//! Contact Sensing
//!
//! Server-side stand-in for the engine's physics push: circle overlap over
//! fighter bodies, reported once per overlap onset. Each fighter of an
//! overlapping pair reports the contact from its own point of view, exactly
//! as engine colliders would. Deployments embedded in an engine can skip
//! this and feed `tick()` their own contact stream.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIGHTER_REACH, fixed_mul};
use crate::core::vec2::FixedVec2;
use crate::game::fighter::EntityId;
use crate::game::hit::Contact;
use crate::game::registry::EntityRegistry;

/// Check if two circles overlap.
#[inline]
pub fn circles_overlap(pos_a: FixedVec2, radius_a: Fixed, pos_b: FixedVec2, radius_b: Fixed) -> bool {
    let combined = radius_a + radius_b;
    let combined_sq = fixed_mul(combined, combined);
    pos_a.distance_squared(pos_b) <= combined_sq
}

/// Tracks which fighter pairs currently overlap, so contacts are emitted
/// on onset only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContactTracker {
    overlapping: BTreeSet<(EntityId, EntityId)>,
}

impl ContactTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all overlap state (round start: everyone respawned apart).
    pub fn clear(&mut self) {
        self.overlapping.clear();
    }

    /// Scan alive fighters and report newly-onset overlaps.
    ///
    /// Pairs are visited in ascending id order; for each new overlap both
    /// parties report, lower id first. Deterministic by construction.
    pub fn detect(&mut self, registry: &EntityRegistry) -> Vec<Contact> {
        let ids = registry.alive_ids();
        let mut contacts = Vec::new();
        let mut now_overlapping = BTreeSet::new();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (id_a, id_b) = (ids[i], ids[j]);
                let (Some(a), Some(b)) = (registry.get(id_a), registry.get(id_b)) else {
                    continue;
                };

                if !circles_overlap(a.body.position, FIGHTER_REACH, b.body.position, FIGHTER_REACH) {
                    continue;
                }

                now_overlapping.insert((id_a, id_b));

                if !self.overlapping.contains(&(id_a, id_b)) {
                    contacts.push(Contact { reporter: id_a, other: id_b });
                    contacts.push(Contact { reporter: id_b, other: id_a });
                }
            }
        }

        self.overlapping = now_overlapping;
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::game::combat::MoveSet;
    use crate::game::fighter::{Fighter, Team};

    fn fighter_at(id: u32, team: &str, x: Fixed) -> Fighter {
        Fighter::new(
            EntityId(id),
            Team::new(team),
            FixedVec2::new(x, 0),
            1000,
            MoveSet::default(),
        )
    }

    #[test]
    fn test_circles_overlap() {
        let r = to_fixed(0.6);
        assert!(circles_overlap(FixedVec2::ZERO, r, FixedVec2::new(to_fixed(1.0), 0), r));
        assert!(!circles_overlap(FixedVec2::ZERO, r, FixedVec2::new(to_fixed(2.0), 0), r));
    }

    #[test]
    fn test_contact_on_onset_only() {
        let mut reg = EntityRegistry::new();
        reg.insert(fighter_at(1, "red", 0));
        reg.insert(fighter_at(2, "blue", to_fixed(1.0)));

        let mut tracker = ContactTracker::new();

        // First scan: both parties report the new overlap
        let contacts = tracker.detect(&reg);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0], Contact { reporter: EntityId(1), other: EntityId(2) });
        assert_eq!(contacts[1], Contact { reporter: EntityId(2), other: EntityId(1) });

        // Still overlapping: nothing new
        assert!(tracker.detect(&reg).is_empty());
    }

    #[test]
    fn test_contact_rearms_after_separation() {
        let mut reg = EntityRegistry::new();
        reg.insert(fighter_at(1, "red", 0));
        reg.insert(fighter_at(2, "blue", to_fixed(1.0)));

        let mut tracker = ContactTracker::new();
        assert_eq!(tracker.detect(&reg).len(), 2);

        // Separate
        reg.get_mut(EntityId(2)).unwrap().body.position = FixedVec2::new(to_fixed(10.0), 0);
        assert!(tracker.detect(&reg).is_empty());

        // Close in again: onset fires again
        reg.get_mut(EntityId(2)).unwrap().body.position = FixedVec2::new(to_fixed(1.0), 0);
        assert_eq!(tracker.detect(&reg).len(), 2);
    }

    #[test]
    fn test_dead_fighters_do_not_contact() {
        let mut reg = EntityRegistry::new();
        reg.insert(fighter_at(1, "red", 0));
        reg.insert(fighter_at(2, "blue", to_fixed(1.0)));
        reg.remove_from_alive(EntityId(2));

        let mut tracker = ContactTracker::new();
        assert!(tracker.detect(&reg).is_empty());
    }

    #[test]
    fn test_clear_rearms() {
        let mut reg = EntityRegistry::new();
        reg.insert(fighter_at(1, "red", 0));
        reg.insert(fighter_at(2, "blue", to_fixed(1.0)));

        let mut tracker = ContactTracker::new();
        tracker.detect(&reg);
        tracker.clear();
        assert_eq!(tracker.detect(&reg).len(), 2);
    }
}
