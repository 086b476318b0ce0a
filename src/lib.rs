//! # Scrap Arena Server
//!
//! Authoritative combat server for Scrap Arena, a networked team
//! robot-fighting game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SCRAP ARENA SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Combat simulation (deterministic)         │
//! │  ├── combat.rs   - Combat state set and transition rules     │
//! │  ├── machine.rs  - Per-fighter state machine                 │
//! │  ├── hit.rs      - Contact validity and hit application      │
//! │  ├── registry.rs - All/alive fighter bookkeeping             │
//! │  ├── round.rs    - Round/match termination, delayed flows    │
//! │  ├── tick.rs     - Authoritative per-tick pipeline           │
//! │  └── replay.rs   - Match transcripts and verification        │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Arena session management                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (BTreeMap/BTreeSet for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given identical inputs, contacts and RNG seed, the simulation produces
//! **identical results** on any platform. A recorded match transcript can
//! therefore be replayed anywhere and audited against the live state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use crate::core::vec2::FixedVec2;
pub use crate::core::rng::DeterministicRng;
pub use game::combat::{CombatState, StateKind};
pub use game::fighter::{EntityId, Fighter, Team};
pub use game::input::InputSnapshot;
pub use game::tick::{ArenaState, ArenaConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Round duration in ticks (60 seconds * 60 Hz)
pub const ROUND_DURATION_TICKS: u32 = 3600;
