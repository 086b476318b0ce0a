//! Core deterministic primitives.
//!
//! Everything in this module is bit-identical across platforms. The combat
//! simulation is built entirely on these types.

pub mod fixed;
pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use rng::DeterministicRng;
pub use hash::{StateHash, compute_state_hash};
