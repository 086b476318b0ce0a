//! Animation Collaborator
//!
//! The combat states never author animation; they read playback signals and
//! write named boolean flags. `Animator` is that boundary. `ClipAnimator`
//! is the deterministic tick-driven implementation the server runs: setting
//! a flag starts a short blend toward the clip of the same name, clearing it
//! blends back to idle, and normalized time ramps by one clip-length per
//! tick once the clip is confirmed playing.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::game::combat::CLIP_IDLE;

/// Read/write surface of the animation system as seen by combat states.
pub trait Animator {
    /// Is the named clip the one currently playing (not merely blending in)?
    fn is_playing(&self, clip: &str) -> bool;

    /// Playback progress of the given layer. `FIXED_ONE` is one full pass;
    /// values beyond it mean the clip has run past its end.
    fn normalized_time(&self, layer: usize) -> Fixed;

    /// Is the given layer mid-blend between two clips?
    fn in_transition(&self, layer: usize) -> bool;

    /// Set or clear a named boolean flag.
    fn set_flag(&mut self, name: &str, value: bool);
}

/// Ticks a blend between clips takes (0.1s at 60 Hz).
pub const BLEND_TICKS: u32 = 6;

/// Clip length assumed when a clip has no entry in the table.
pub const DEFAULT_CLIP_TICKS: u32 = 30;

/// Deterministic clip playback model.
///
/// One layer. The flag vocabulary is the clip vocabulary: raising flag
/// `"attack"` blends to clip `"attack"`; lowering it blends home to idle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClipAnimator {
    current: String,
    pending: Option<String>,
    blend_left: u32,
    ticks_in_clip: u32,
    clip_ticks: BTreeMap<String, u32>,
    flags: BTreeMap<String, bool>,
}

impl Default for ClipAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipAnimator {
    /// Create an animator resting in the idle clip.
    pub fn new() -> Self {
        Self {
            current: CLIP_IDLE.to_string(),
            pending: None,
            blend_left: 0,
            ticks_in_clip: 0,
            flags: BTreeMap::new(),
            clip_ticks: BTreeMap::from([
                ("attack".to_string(), 40),
                ("block".to_string(), 30),
                ("hitstun".to_string(), 20),
            ]),
        }
    }

    /// Override a clip's length in ticks.
    pub fn set_clip_ticks(&mut self, clip: &str, ticks: u32) {
        self.clip_ticks.insert(clip.to_string(), ticks.max(1));
    }

    /// Name of the clip currently playing.
    pub fn current_clip(&self) -> &str {
        &self.current
    }

    /// Current value of a flag (unset flags read false).
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Advance playback by one tick.
    ///
    /// While a blend is pending the target clip is not yet "playing"; the
    /// old clip keeps its identity until the blend completes.
    pub fn advance(&mut self) {
        if self.pending.is_some() {
            if self.blend_left > 0 {
                self.blend_left -= 1;
            }
            if self.blend_left == 0 {
                if let Some(next) = self.pending.take() {
                    self.current = next;
                    self.ticks_in_clip = 0;
                }
            }
        } else {
            self.ticks_in_clip = self.ticks_in_clip.saturating_add(1);
        }
    }

    fn clip_len(&self, clip: &str) -> u32 {
        self.clip_ticks.get(clip).copied().unwrap_or(DEFAULT_CLIP_TICKS).max(1)
    }

    fn begin_blend(&mut self, clip: &str) {
        if self.pending.as_deref() == Some(clip) {
            return;
        }
        if self.pending.is_none() && self.current == clip {
            return;
        }
        self.pending = Some(clip.to_string());
        self.blend_left = BLEND_TICKS;
    }
}

impl Animator for ClipAnimator {
    fn is_playing(&self, clip: &str) -> bool {
        self.current == clip
    }

    fn normalized_time(&self, _layer: usize) -> Fixed {
        let len = self.clip_len(&self.current) as i64;
        ((self.ticks_in_clip as i64 * FIXED_ONE as i64) / len) as Fixed
    }

    fn in_transition(&self, _layer: usize) -> bool {
        self.pending.is_some()
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        self.flags.insert(name.to_string(), value);

        if value {
            self.begin_blend(name);
        } else {
            let headed_there = self.pending.as_deref() == Some(name)
                || (self.pending.is_none() && self.current == name);
            if headed_there {
                self.begin_blend(CLIP_IDLE);
            }
        }
    }
}
