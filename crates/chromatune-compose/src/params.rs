//! Feature-to-parameter mapping.
//!
//! Deterministically turns [`ImageFeatures`] plus user multipliers into
//! the scalar musical controls that drive composition: tempo, base
//! volume, note density, and the rhythm duration sequence.

use chromatune_vision::ImageFeatures;
use serde::{Deserialize, Serialize};

/// Rhythm sequences in quarter-length beat units, sparsest to densest.
pub const RHYTHM_SPARSE: &[f64] = &[4.0, 2.0];
pub const RHYTHM_MEDIUM: &[f64] = &[2.0, 1.0, 0.5];
pub const RHYTHM_DENSE: &[f64] = &[1.0, 0.5, 0.25];

/// User-supplied generation settings with documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub dominant: String,
    pub scale_type: String,
    pub note_len: u32,
    pub volume_mult: f64,
    pub bpm_mult: f64,
    pub rhythm_complexity: f64,
    /// Optional seed pinning motif and instrument selection. When absent
    /// the server draws a fresh seed per request.
    pub seed: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            dominant: "Acoustic Grand Piano".to_string(),
            scale_type: "Major".to_string(),
            note_len: 32,
            volume_mult: 1.0,
            bpm_mult: 1.0,
            rhythm_complexity: 0.5,
            seed: None,
        }
    }
}

/// Musical controls derived from one image. Immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionParams {
    pub bpm: u32,
    /// MIDI-style velocity scale, pre-clamp; per-part scaling applies later.
    pub base_volume: i32,
    /// Fraction of the requested length that is actually filled, in [0.1, 1.0].
    pub note_density: f64,
    pub rhythm: &'static [f64],
}

/// Map image features and settings onto composition parameters.
pub fn map_parameters(features: &ImageFeatures, settings: &GenerationSettings) -> CompositionParams {
    let energy = (features.edge_density as f64 + features.texture_variance as f64 / 10_000.0)
        .clamp(0.0, 1.0);

    let bpm = (lerp(energy, 40.0, 180.0) * settings.bpm_mult).floor() as u32;
    let base_volume = ((features.mean_value as f64 / 255.0 * 127.0).clamp(30.0, 120.0)
        * settings.volume_mult)
        .floor() as i32;
    let note_density = lerp(energy, 0.1, 1.0);

    // Busy images with low requested complexity (and vice versa) land in
    // the middle; the extremes need both pulling the same way.
    let complexity = ((1.0 - energy) * settings.rhythm_complexity
        + energy * (1.0 - settings.rhythm_complexity))
        .clamp(0.0, 1.0);
    let rhythm = if complexity < 0.3 {
        RHYTHM_SPARSE
    } else if complexity < 0.7 {
        RHYTHM_MEDIUM
    } else {
        RHYTHM_DENSE
    };

    CompositionParams {
        bpm,
        base_volume,
        note_density,
        rhythm,
    }
}

fn lerp(t: f64, lo: f64, hi: f64) -> f64 {
    lo + t * (hi - lo)
}
