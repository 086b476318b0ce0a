//! Input Capture and Normalization
//!
//! Per-tick input snapshots, engine-agnostic: two stick axes plus button
//! flags. Stick axes travel as i8 and are converted to Q16.16 through a
//! lookup table so every host normalizes identically.

use serde::{Serialize, Deserialize};
use crate::core::fixed::{Fixed, STICK_DEADZONE, fixed_abs};
use crate::core::vec2::FixedVec2;
use crate::game::fighter::EntityId;

// =============================================================================
// STICK LOOKUP TABLE
// =============================================================================

/// Lookup table converting an i8 stick axis to Fixed.
///
/// `value * 65536 / 127` is not an integer multiple, so floor division is
/// precomputed for all 256 byte patterns. Index 128 (-128 as i8) is the
/// "stick released" sentinel and maps to 0.
pub static STICK_LUT: [Fixed; 256] = {
    let mut lut = [0i32; 256];
    let mut i = 0i32;
    while i < 256 {
        let signed = if i < 128 { i } else { i - 256 };

        if signed == -128 {
            lut[i as usize] = 0;
        } else {
            lut[i as usize] = (signed * 65536) / 127;
        }
        i += 1;
    }
    lut
};

/// Convert an i8 stick axis to Fixed using the lookup table.
#[inline]
pub fn stick_to_fixed(input: i8) -> Fixed {
    STICK_LUT[(input as u8) as usize]
}

// =============================================================================
// INPUT SNAPSHOT
// =============================================================================

/// Normalized input for a single tick.
///
/// This is the complete input surface of a fighter: left stick plus three
/// buttons. Attack and block are edge-triggered (pressed this tick); the
/// run trigger is level-triggered (held).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct InputSnapshot {
    /// Stick X axis: -127 (left) to +127 (right), -128 = released
    pub stick_x: i8,

    /// Stick Y axis: -127 (back) to +127 (forward), -128 = released
    pub stick_y: i8,

    /// Button flags (packed bits), see the `BTN_*` constants.
    pub buttons: u8,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSnapshot {
    /// Sentinel for a released stick axis.
    pub const STICK_RELEASED: i8 = -128;

    /// Attack button pressed this tick (edge).
    pub const BTN_ATTACK: u8 = 0x01;

    /// Block button pressed this tick (edge).
    pub const BTN_BLOCK: u8 = 0x02;

    /// Run trigger currently held (level).
    pub const BTN_RUN: u8 = 0x04;

    /// Create an empty snapshot (stick released, no buttons).
    pub const fn new() -> Self {
        Self {
            stick_x: Self::STICK_RELEASED,
            stick_y: Self::STICK_RELEASED,
            buttons: 0,
        }
    }

    /// Create a snapshot with stick deflection only.
    pub const fn with_stick(stick_x: i8, stick_y: i8) -> Self {
        Self {
            stick_x,
            stick_y,
            buttons: 0,
        }
    }

    /// Get the stick as a FixedVec2.
    #[inline]
    pub fn stick(&self) -> FixedVec2 {
        FixedVec2 {
            x: stick_to_fixed(self.stick_x),
            y: stick_to_fixed(self.stick_y),
        }
    }

    /// True when either axis is deflected beyond the deadzone.
    ///
    /// The released sentinel converts to 0 and therefore never counts as
    /// deflection - a half-valid snapshot degrades to "neutral", it does
    /// not fault.
    #[inline]
    pub fn beyond_deadzone(&self) -> bool {
        let stick = self.stick();
        fixed_abs(stick.x) > STICK_DEADZONE || fixed_abs(stick.y) > STICK_DEADZONE
    }

    /// Attack button pressed this tick.
    #[inline]
    pub fn attack_pressed(&self) -> bool {
        self.buttons & Self::BTN_ATTACK != 0
    }

    /// Block button pressed this tick.
    #[inline]
    pub fn block_pressed(&self) -> bool {
        self.buttons & Self::BTN_BLOCK != 0
    }

    /// Run trigger currently held.
    #[inline]
    pub fn run_held(&self) -> bool {
        self.buttons & Self::BTN_RUN != 0
    }

    /// True when the snapshot carries no input at all.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.stick_x == Self::STICK_RELEASED
            && self.stick_y == Self::STICK_RELEASED
            && self.buttons == 0
    }

    /// Set or clear the attack flag.
    #[inline]
    pub fn set_attack(&mut self, pressed: bool) {
        if pressed {
            self.buttons |= Self::BTN_ATTACK;
        } else {
            self.buttons &= !Self::BTN_ATTACK;
        }
    }

    /// Set or clear the block flag.
    #[inline]
    pub fn set_block(&mut self, pressed: bool) {
        if pressed {
            self.buttons |= Self::BTN_BLOCK;
        } else {
            self.buttons &= !Self::BTN_BLOCK;
        }
    }

    /// Set or clear the run flag.
    #[inline]
    pub fn set_run(&mut self, held: bool) {
        if held {
            self.buttons |= Self::BTN_RUN;
        } else {
            self.buttons &= !Self::BTN_RUN;
        }
    }
}

// =============================================================================
// INPUT RECORDING (delta-compressed, for replay)
// =============================================================================

/// A change of input state, stamped with the tick it began.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this input state began
    pub tick: u32,
    /// The new input state
    pub snapshot: InputSnapshot,
}

/// Complete input recording for one fighter in one round.
///
/// Stores only the ticks where input changed; a 60 Hz round of ordinary
/// play compresses to a few hundred entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FighterInputBuffer {
    /// Fighter this buffer belongs to
    pub entity: EntityId,

    /// Last tick recorded
    pub end_tick: u32,

    deltas: Vec<InputDelta>,

    #[serde(skip)]
    last_snapshot: InputSnapshot,
}

impl FighterInputBuffer {
    /// Create an empty buffer for a fighter.
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            end_tick: 0,
            deltas: Vec::with_capacity(256),
            last_snapshot: InputSnapshot::new(),
        }
    }

    /// Record input for a tick. Stores an entry only when it changed.
    pub fn record(&mut self, tick: u32, snapshot: InputSnapshot) {
        self.end_tick = tick;

        if snapshot != self.last_snapshot {
            self.deltas.push(InputDelta { tick, snapshot });
            self.last_snapshot = snapshot;
        }
    }

    /// Get the input in effect at a specific tick (binary search).
    pub fn input_at(&self, tick: u32) -> InputSnapshot {
        let idx = self.deltas.partition_point(|d| d.tick <= tick);

        if idx == 0 {
            InputSnapshot::new()
        } else {
            self.deltas[idx - 1].snapshot
        }
    }

    /// Number of stored deltas.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;

    #[test]
    fn test_stick_lut_values() {
        assert_eq!(STICK_LUT[0], 0);
        assert_eq!(STICK_LUT[127], FIXED_ONE);
        assert_eq!(STICK_LUT[129], -FIXED_ONE); // 129 as u8 = -127 as i8
        assert_eq!(STICK_LUT[128], 0); // released sentinel

        for i in 1..=127 {
            let pos = STICK_LUT[i as usize];
            let neg = STICK_LUT[(256 - i) as usize];
            assert_eq!(pos, -neg, "LUT should be symmetric for {i}");
        }
    }

    #[test]
    fn test_deadzone() {
        // 0.2 of full deflection is 25.4 on the i8 scale
        assert!(!InputSnapshot::with_stick(0, 0).beyond_deadzone());
        assert!(!InputSnapshot::with_stick(25, 25).beyond_deadzone());
        assert!(InputSnapshot::with_stick(26, 0).beyond_deadzone());
        assert!(InputSnapshot::with_stick(0, -26).beyond_deadzone());
        assert!(InputSnapshot::with_stick(127, 127).beyond_deadzone());
    }

    #[test]
    fn test_released_stick_is_neutral() {
        let snap = InputSnapshot::new();
        assert!(snap.is_idle());
        assert!(!snap.beyond_deadzone());
        assert_eq!(snap.stick(), FixedVec2::ZERO);
    }

    #[test]
    fn test_button_flags() {
        let mut snap = InputSnapshot::new();
        assert!(!snap.attack_pressed());
        assert!(!snap.block_pressed());
        assert!(!snap.run_held());

        snap.set_attack(true);
        snap.set_run(true);
        assert!(snap.attack_pressed());
        assert!(!snap.block_pressed());
        assert!(snap.run_held());

        snap.set_attack(false);
        assert!(!snap.attack_pressed());
        assert!(snap.run_held());
    }

    #[test]
    fn test_buffer_delta_compression() {
        let mut buffer = FighterInputBuffer::new(EntityId(1));

        let snap = InputSnapshot::with_stick(100, 0);
        buffer.record(0, snap);
        buffer.record(1, snap);
        buffer.record(2, snap);
        assert_eq!(buffer.delta_count(), 1);

        buffer.record(3, InputSnapshot::with_stick(-100, 0));
        assert_eq!(buffer.delta_count(), 2);
    }

    #[test]
    fn test_buffer_input_at() {
        let mut buffer = FighterInputBuffer::new(EntityId(1));

        let first = InputSnapshot::with_stick(50, 0);
        let second = InputSnapshot::with_stick(-50, 0);

        buffer.record(10, first);
        buffer.record(20, second);

        assert!(buffer.input_at(5).is_idle());
        assert_eq!(buffer.input_at(10), first);
        assert_eq!(buffer.input_at(15), first);
        assert_eq!(buffer.input_at(20), second);
        assert_eq!(buffer.input_at(999), second);
    }
}
