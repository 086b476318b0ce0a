//! Fixed-Point 2D Vector
//!
//! Deterministic planar math for fighter locomotion. The arena floor is a
//! plane; height never enters the simulation.

use std::fmt;
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, FIXED_ONE, FIXED_SCALE, ARENA_HALF_EXTENT,
    fixed_mul, fixed_div, fixed_sqrt, fixed_clamp, to_float,
};

/// 2D vector with Q16.16 components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: FIXED_ONE, y: 0 };

    /// Unit vector pointing forward (+Y)
    pub const FORWARD: Self = Self { x: 0, y: FIXED_ONE };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Squared length. Prefer this over `length` where only comparisons
    /// are needed - it avoids the sqrt entirely.
    #[inline]
    pub fn length_squared(self) -> Fixed {
        fixed_mul(self.x, self.x).wrapping_add(fixed_mul(self.y, self.y))
    }

    /// Length via deterministic fixed sqrt.
    #[inline]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Normalize to unit length. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0 {
            return Self::ZERO;
        }
        Self {
            x: fixed_div(self.x, len),
            y: fixed_div(self.y, len),
        }
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> Fixed {
        self.sub(other).length_squared()
    }

    /// Clamp both components to the arena floor.
    #[inline]
    pub fn clamp_to_arena(self) -> Self {
        Self {
            x: fixed_clamp(self.x, -ARENA_HALF_EXTENT, ARENA_HALF_EXTENT),
            y: fixed_clamp(self.y, -ARENA_HALF_EXTENT, ARENA_HALF_EXTENT),
        }
    }

    /// Convert to floats for display.
    pub fn to_floats(self) -> (f32, f32) {
        (to_float(self.x), to_float(self.y))
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.to_floats();
        write!(f, "({x:.3}, {y:.3})")
    }
}
