//! Hit Resolution
//!
//! Converts a physical contact into an authoritative hit event. A contact
//! is just "these two touched" from the physics collaborator; whether it
//! counts is decided here, once, on the host. Most contacts are expected to
//! fail the predicate - bumping into an opponent outside the active window
//! is not an error, it is fighting.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::game::authority::Authority;
use crate::game::fighter::EntityId;
use crate::game::combat::CombatState;
use crate::game::registry::EntityRegistry;
use crate::game::wreck::Wrecker;

/// Health points lost per point of attack damage.
pub const HEALTH_PER_DAMAGE_POINT: i32 = 100;

/// A physical contact pushed in by the physics collaborator, delivered
/// once per overlap onset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The entity whose collider reported the contact
    pub reporter: EntityId,
    /// The other party
    pub other: EntityId,
}

/// The authoritative outcome of a successful hit resolution.
///
/// Ephemeral: broadcast to observers, applied once per `(attacker,
/// sequence)` on each copy of the target, then discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Fighter that landed the attack
    pub attacker: EntityId,
    /// Fighter being hit
    pub target: EntityId,
    /// Damage points (health delta is `damage * 100`)
    pub damage: u32,
    /// Hitstun ticks forced onto the target
    pub hitstun: u32,
    /// Per-attack de-duplication key: the tick the attack state was
    /// entered. Monotonic per attacker, so re-deliveries are ignorable.
    pub sequence: u32,
}

/// Is an attack's hitbox live on this frame?
///
/// The active window is the closed interval `[min, max]`.
#[inline]
pub fn is_attack_active(frame: u32, min: u32, max: u32) -> bool {
    frame >= min && frame <= max
}

/// Decide whether a contact is a valid hit. Host-side only.
///
/// All of these must hold:
/// 1. the reporter is locally authoritative here (each hit resolves on
///    exactly one simulation copy),
/// 2. the other party is on an opposing team,
/// 3. the reporter is currently attacking,
/// 4. the attack is inside its active window,
/// 5. the other party resolves to a known fighter.
///
/// A failed check produces no event and no error.
pub fn resolve_contact(
    registry: &EntityRegistry,
    authority: &Authority,
    contact: &Contact,
) -> Option<HitEvent> {
    if !authority.is_host || !authority.is_local(contact.reporter) {
        return None;
    }

    let reporter = registry.get(contact.reporter)?;
    let target = registry.get(contact.other)?;

    if target.team == reporter.team {
        return None;
    }

    let CombatState::Attack {
        current_frame,
        min_active_frame,
        max_active_frame,
        damage,
        hitstun,
    } = reporter.machine.current()
    else {
        return None;
    };

    if !is_attack_active(*current_frame, *min_active_frame, *max_active_frame) {
        return None;
    }

    Some(HitEvent {
        attacker: contact.reporter,
        target: contact.other,
        damage: *damage,
        hitstun: *hitstun,
        sequence: reporter.machine.entered_tick(),
    })
}

/// Apply a hit event to its addressed target.
///
/// Runs on every simulation copy that receives the broadcast. An unknown
/// target id is a warning and a no-op, never a fault - the fighter may
/// have left the match between resolution and delivery.
pub fn apply_hit(
    registry: &mut EntityRegistry,
    event: &HitEvent,
    tick: u32,
    wrecker: &mut dyn Wrecker,
) -> bool {
    let Some(target) = registry.get_mut(event.target) else {
        warn!(
            victim = event.target.0,
            attacker = event.attacker.0,
            "hit event addressed to unknown fighter"
        );
        return false;
    };

    let applied = target.receive_hit(event, tick, wrecker);
    if applied {
        debug!(
            attacker = event.attacker.0,
            victim = event.target.0,
            damage = event.damage,
            hitstun = event.hitstun,
            "hit applied"
        );
    }
    applied
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The active-window predicate is exactly the closed interval check.
        #[test]
        fn active_window_is_closed_interval(
            frame in 0u32..64,
            min in 0u32..32,
            span in 0u32..32,
        ) {
            let max = min + span;
            let expected = frame >= min && frame <= max;
            prop_assert_eq!(is_attack_active(frame, min, max), expected);
        }
    }
}
