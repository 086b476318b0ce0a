//! Combat Simulation
//!
//! All deterministic game logic. Nothing in here touches the network,
//! wall-clock time or floating point.
//!
//! ## Module Structure
//!
//! - `input`: per-tick input snapshots and replay buffers
//! - `animation`: the animator collaborator boundary and clip model
//! - `combat`: the combat state set and its transition rules
//! - `machine`: the per-fighter state machine
//! - `fighter`: fighter identity, health, body
//! - `authority`: which copies of the simulation decide what
//! - `registry`: all/alive fighter bookkeeping
//! - `hit`: contact validity and hit application
//! - `contact`: overlap-onset sensing (physics stand-in)
//! - `scoreboard`: team win tally
//! - `round`: round/match termination and delayed flows
//! - `wreck`: the lose-state chassis teardown
//! - `events`: totally-ordered simulation events
//! - `tick`: the authoritative per-tick pipeline
//! - `replay`: match transcripts and verification

pub mod input;
pub mod animation;
pub mod combat;
pub mod machine;
pub mod fighter;
pub mod authority;
pub mod registry;
pub mod hit;
pub mod contact;
pub mod scoreboard;
pub mod round;
pub mod wreck;
pub mod events;
pub mod tick;
pub mod replay;

// Re-export key types
pub use input::InputSnapshot;
pub use combat::{CombatState, StateKind, MoveSet, AttackProfile};
pub use fighter::{EntityId, Fighter, Team};
pub use hit::{Contact, HitEvent};
pub use registry::EntityRegistry;
pub use tick::{ArenaState, ArenaConfig, ArenaPhase, TickResult};
pub use events::GameEvent;
