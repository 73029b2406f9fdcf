//! The synchronous generation pipeline.
//!
//! Runs start-to-finish on one worker: feature extraction, parameter
//! mapping, harmony and motif derivation, score assembly, MIDI
//! serialization, and soundfont rendering to the destination path. No
//! internal parallelism, no cancellation, no retries.

use std::path::Path;

use chromatune_compose::{
    build_scale, chord_progression, compose_score, create_rng, generate_motif, map_parameters,
    root_from_histogram, score_to_midi, ComposeError, GenerationSettings, ScaleMode,
};
use chromatune_render::{waveform_preview, AudioRenderer, RenderError};
use chromatune_vision::{extract_features, VisionError};
use thiserror::Error;

/// Internal pipeline error taxonomy; collapsed to a generic failure at
/// the HTTP boundary after logging.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to store audio artifact: {0}")]
    Store(#[from] std::io::Error),
}

/// What the caller gets back besides the stored artifact.
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    pub bpm: u32,
    pub instruments: Vec<String>,
    pub duration: f64,
    pub waveform: Vec<f32>,
    pub hue_histogram: Vec<f32>,
}

/// Generate a composition from image bytes and write the WAV to `out_path`.
pub fn generate(
    image_bytes: &[u8],
    settings: &GenerationSettings,
    renderer: &dyn AudioRenderer,
    out_path: &Path,
) -> Result<GenerationSummary, PipelineError> {
    let features = extract_features(image_bytes)?;
    tracing::debug!(
        edge_density = features.edge_density,
        texture_variance = features.texture_variance,
        mean_value = features.mean_value,
        "extracted image features"
    );

    let params = map_parameters(&features, settings);
    let mode = ScaleMode::parse(&settings.scale_type)?;
    let scale = build_scale(mode, root_from_histogram(&features.hue_histogram));
    let progression = chord_progression(&scale);

    let seed = settings.seed.unwrap_or_else(rand::random);
    let mut rng = create_rng(seed);
    let motif = generate_motif(&features.hue_histogram, &scale, &mut rng);
    let score = compose_score(
        &params,
        &progression,
        &motif,
        &settings.dominant,
        settings.note_len,
        &mut rng,
    )?;

    tracing::info!(
        bpm = score.bpm,
        effective_len = score.effective_len,
        seed,
        scale = mode.name(),
        "composed score"
    );

    let midi_bytes = score_to_midi(&score);
    let wav_bytes = renderer.render(&midi_bytes)?;
    std::fs::write(out_path, &wav_bytes)?;

    Ok(GenerationSummary {
        bpm: score.bpm,
        instruments: score.melodic_instruments(),
        duration: score.duration_secs(),
        waveform: waveform_preview(&wav_bytes),
        hue_histogram: features.hue_histogram.to_vec(),
    })
}
