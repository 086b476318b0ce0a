//! Local Authority View
//!
//! Which copies of the simulation may make decisions. Hit resolution runs
//! only on the host, and only for fighters it locally owns; observers
//! replay broadcast outcomes. The networking layer fills this in - the
//! game code only reads it.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::game::fighter::EntityId;

/// The authority this simulation instance holds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Authority {
    /// Is this the authoritative host for the match?
    pub is_host: bool,
    local: BTreeSet<EntityId>,
}

impl Authority {
    /// A host that owns every listed fighter (dedicated-server shape).
    pub fn host_of(ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            is_host: true,
            local: ids.into_iter().collect(),
        }
    }

    /// A pure observer owning nothing.
    pub fn observer() -> Self {
        Self {
            is_host: false,
            local: BTreeSet::new(),
        }
    }

    /// An observer that still owns some fighters (peer-hosted shape).
    pub fn observer_owning(ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            is_host: false,
            local: ids.into_iter().collect(),
        }
    }

    /// Does this instance own the given fighter?
    pub fn is_local(&self, id: EntityId) -> bool {
        self.local.contains(&id)
    }

    /// Take ownership of a fighter (e.g. on join).
    pub fn grant(&mut self, id: EntityId) {
        self.local.insert(id);
    }

    /// Release ownership of a fighter (e.g. on leave).
    pub fn revoke(&mut self, id: EntityId) {
        self.local.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_owns_listed_ids() {
        let auth = Authority::host_of([EntityId(1), EntityId(2)]);
        assert!(auth.is_host);
        assert!(auth.is_local(EntityId(1)));
        assert!(!auth.is_local(EntityId(3)));
    }

    #[test]
    fn test_observer_owns_nothing() {
        let auth = Authority::observer();
        assert!(!auth.is_host);
        assert!(!auth.is_local(EntityId(1)));
    }

    #[test]
    fn test_grant_revoke() {
        let mut auth = Authority::host_of([]);
        auth.grant(EntityId(9));
        assert!(auth.is_local(EntityId(9)));
        auth.revoke(EntityId(9));
        assert!(!auth.is_local(EntityId(9)));
    }
}
