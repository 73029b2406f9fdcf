//! Image-to-score composition for Chromatune.
//!
//! Maps extracted visual features plus user multipliers into musical
//! control parameters, derives a scale, chord progression, and motif,
//! assembles a five-part symbolic score, and serializes it to a Standard
//! MIDI File for rendering.
//!
//! All randomness (motif sampling, support instrument selection) flows
//! through a caller-supplied PCG32 so identical inputs and seed produce an
//! identical score.

pub mod midi;
pub mod motif;
pub mod params;
pub mod rng;
pub mod score;
pub mod theory;

pub use midi::score_to_midi;
pub use motif::{generate_motif, MOTIF_LEN};
pub use params::{map_parameters, CompositionParams, GenerationSettings};
pub use rng::create_rng;
pub use score::{compose_score, NoteEvent, Part, Score, INSTRUMENT_TABLE};
pub use theory::{build_scale, chord_progression, root_from_histogram, Scale, ScaleMode};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    /// The requested scale mode name is not one of the recognized entries.
    #[error("unknown scale mode '{0}'")]
    UnknownScaleMode(String),
    /// The dominant instrument name is not in the instrument table.
    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),
    /// Too few support instrument candidates after excluding the dominant.
    #[error("insufficient instruments: {available} available, {needed} needed")]
    InsufficientInstruments { available: usize, needed: usize },
}
