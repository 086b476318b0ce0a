//! Deterministic Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. Given the same seed the sequence
//! is identical on every platform, which keeps spawn placement replayable.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use super::fixed::{Fixed, ARENA_HALF_EXTENT, fixed_mul, FIXED_ONE};
use super::vec2::FixedVec2;

/// Deterministic PRNG using the Xorshift128+ algorithm.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// SplitMix64 expands the seed so weak seeds still give a well-mixed
    /// starting state.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // The all-zero state is a fixed point of xorshift
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random Fixed in range [0, max).
    #[inline]
    pub fn next_fixed(&mut self, max: Fixed) -> Fixed {
        if max <= 0 {
            return 0;
        }
        let raw = (self.next_u64() & 0xFFFF) as Fixed; // [0, FIXED_ONE)
        fixed_mul(raw, max)
    }

    /// Random spawn position inside the central 80% of the arena floor.
    pub fn spawn_position(&mut self) -> FixedVec2 {
        let span = fixed_mul(ARENA_HALF_EXTENT, FIXED_ONE * 8 / 10);
        let x = self.next_fixed(span * 2) - span;
        let y = self.next_fixed(span * 2) - span;
        FixedVec2::new(x, y)
    }
}

/// SplitMix64: expands a seed into well-distributed state words.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a match seed from the match id, round index and the sorted roster.
///
/// Hashing the roster in means no participant can predict spawn placement
/// before the roster is final.
pub fn derive_round_seed(match_id: &[u8; 16], round: u32, entity_ids: &[u32]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"SCRAP_ARENA_SEED_V1");
    hasher.update(match_id);
    hasher.update(round.to_le_bytes());

    let mut sorted: Vec<u32> = entity_ids.to_vec();
    sorted.sort_unstable();
    for id in sorted {
        hasher.update(id.to_le_bytes());
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
