//! Audio rendering for Chromatune.
//!
//! Turns a serialized MIDI container into a playable WAV using a
//! soundfont-driven synthesizer. The synthesizer is treated as an opaque
//! renderer behind the [`AudioRenderer`] trait so the pipeline stays
//! testable without real synthesis.

mod render;

pub use render::{waveform_preview, SoundFontRenderer, DEFAULT_SAMPLE_RATE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The soundfont resource could not be loaded.
    #[error("failed to load soundfont: {0}")]
    SoundFont(String),
    /// Synthesis could not produce audio from the note-event container.
    #[error("failed to render audio: {0}")]
    Synthesis(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Narrow rendering contract: MIDI bytes in, WAV bytes out.
pub trait AudioRenderer: Send + Sync {
    fn render(&self, midi_bytes: &[u8]) -> Result<Vec<u8>, RenderError>;
}
