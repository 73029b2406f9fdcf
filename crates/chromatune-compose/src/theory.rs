//! Scales and chord progressions.
//!
//! The root pitch follows the dominant hue bucket; the scale is one of
//! five fixed interval tables; the progression is four triads on a fixed
//! degree pattern.

use crate::ComposeError;

/// Offset added to the dominant-hue index to place the root.
pub const BASE_ROOT: u8 = 48;

/// Degrees of the four-chord progression (I-V-vi-IV shape).
pub const CHORD_DEGREES: [usize; 4] = [0, 4, 5, 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleMode {
    Major,
    NaturalMinor,
    Pentatonic,
    Blues,
    Dorian,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 5] = [
        ScaleMode::Major,
        ScaleMode::NaturalMinor,
        ScaleMode::Pentatonic,
        ScaleMode::Blues,
        ScaleMode::Dorian,
    ];

    /// Parse a user-facing mode name.
    pub fn parse(name: &str) -> Result<Self, ComposeError> {
        match name {
            "Major" => Ok(ScaleMode::Major),
            "Natural Minor" => Ok(ScaleMode::NaturalMinor),
            "Pentatonic" => Ok(ScaleMode::Pentatonic),
            "Blues" => Ok(ScaleMode::Blues),
            "Dorian" => Ok(ScaleMode::Dorian),
            other => Err(ComposeError::UnknownScaleMode(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleMode::Major => "Major",
            ScaleMode::NaturalMinor => "Natural Minor",
            ScaleMode::Pentatonic => "Pentatonic",
            ScaleMode::Blues => "Blues",
            ScaleMode::Dorian => "Dorian",
        }
    }

    /// Semitone offsets from the root.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleMode::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleMode::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleMode::Pentatonic => &[0, 3, 5, 7, 10],
            ScaleMode::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleMode::Dorian => &[0, 2, 3, 5, 7, 9, 10],
        }
    }
}

/// An ordered pitch set built from a root and a mode's interval table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pub mode: ScaleMode,
    pub root: u8,
    pub pitches: Vec<u8>,
}

impl Scale {
    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }
}

/// Derive the root pitch from the dominant hue bucket. On ties the
/// first maximal bucket wins.
pub fn root_from_histogram(hist: &[f32; 12]) -> u8 {
    let mut dominant = 0usize;
    for (i, &weight) in hist.iter().enumerate().skip(1) {
        if weight > hist[dominant] {
            dominant = i;
        }
    }
    BASE_ROOT + (dominant % 24) as u8
}

pub fn build_scale(mode: ScaleMode, root: u8) -> Scale {
    Scale {
        mode,
        root,
        pitches: mode.intervals().iter().map(|&i| root + i).collect(),
    }
}

/// Four triads at scale degrees `[0, 4, 5, 3]`, each stacking thirds at
/// `{d, d+2, d+4}` with all indices wrapped modulo the scale length.
pub fn chord_progression(scale: &Scale) -> [[u8; 3]; 4] {
    let len = scale.len();
    CHORD_DEGREES.map(|d| {
        [
            scale.pitches[d % len],
            scale.pitches[(d + 2) % len],
            scale.pitches[(d + 4) % len],
        ]
    })
}
