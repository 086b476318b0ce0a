//! Wreck Side Effect
//!
//! Losing the match destroys the robot: its visual sub-parts are detached
//! and replaced with a remains prop. The simulation only decides *that* it
//! happens; the presentation-side work sits behind the `Wrecker` trait.
//! Failure to produce the remains is a presentation problem, never a
//! simulation one - callers log and carry on.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::game::fighter::EntityId;

/// Errors from the wreck effect. All recoverable.
#[derive(Debug, Error)]
pub enum WreckError {
    /// The remains prop could not be resolved.
    #[error("remains asset `{0}` is not available")]
    MissingAsset(String),
}

/// Destructive-but-cosmetic teardown of a defeated robot.
pub trait Wrecker {
    /// Wreck the given fighter. Must be idempotent: wrecking an
    /// already-wrecked fighter succeeds and does nothing.
    fn wreck(&mut self, entity: EntityId) -> Result<(), WreckError>;
}

/// Default asset path for robot remains.
pub const REMAINS_ASSET: &str = "robots/remains";

/// Server-side wreck bookkeeping.
///
/// Tracks which fighters have been wrecked so the effect fires once, and
/// which remains asset (if any) replaces the chassis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapHeap {
    remains_asset: Option<String>,
    wrecked: BTreeSet<EntityId>,
}

impl ScrapHeap {
    /// Create a heap with the given remains asset. `None` models a build
    /// where the prop is absent; wrecking then reports `MissingAsset`.
    pub fn new(remains_asset: Option<String>) -> Self {
        Self {
            remains_asset,
            wrecked: BTreeSet::new(),
        }
    }

    /// Has this fighter already been wrecked?
    pub fn is_wrecked(&self, entity: EntityId) -> bool {
        self.wrecked.contains(&entity)
    }
}

impl Default for ScrapHeap {
    fn default() -> Self {
        Self::new(Some(REMAINS_ASSET.to_string()))
    }
}

impl Wrecker for ScrapHeap {
    fn wreck(&mut self, entity: EntityId) -> Result<(), WreckError> {
        if !self.wrecked.insert(entity) {
            return Ok(());
        }

        match &self.remains_asset {
            Some(asset) => {
                debug!(entity = entity.0, asset = %asset, "replaced chassis with remains");
                Ok(())
            }
            None => Err(WreckError::MissingAsset(REMAINS_ASSET.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wreck_once() {
        let mut heap = ScrapHeap::default();
        assert!(!heap.is_wrecked(EntityId(1)));

        heap.wreck(EntityId(1)).unwrap();
        assert!(heap.is_wrecked(EntityId(1)));
        assert!(!heap.is_wrecked(EntityId(2)));
    }

    #[test]
    fn test_wreck_is_idempotent() {
        let mut heap = ScrapHeap::default();
        heap.wreck(EntityId(1)).unwrap();
        // Second call succeeds without doing anything
        heap.wreck(EntityId(1)).unwrap();
        assert!(heap.is_wrecked(EntityId(1)));
    }

    #[test]
    fn test_missing_asset_is_reported_but_recorded() {
        let mut heap = ScrapHeap::new(None);
        let err = heap.wreck(EntityId(1)).unwrap_err();
        assert!(matches!(err, WreckError::MissingAsset(_)));

        // The fighter still counts as wrecked; retry does not re-fail
        assert!(heap.is_wrecked(EntityId(1)));
        heap.wreck(EntityId(1)).unwrap();
    }
}
