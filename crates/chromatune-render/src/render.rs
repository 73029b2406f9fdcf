use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use hound::{WavSpec, WavWriter};
use rustysynth::{MidiFile, MidiFileSequencer, SoundFont, Synthesizer, SynthesizerSettings};
use tempfile::NamedTempFile;

use crate::{AudioRenderer, RenderError};

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Seconds of tail appended after the last note for decay and reverb.
const DECAY_SECONDS: f64 = 3.0;

/// Soundfont-backed renderer.
///
/// The soundfont is parsed once at construction and shared read-only
/// across requests; rendering itself is CPU-bound and synchronous.
#[derive(Debug)]
pub struct SoundFontRenderer {
    sound_font: Arc<SoundFont>,
    sample_rate: u32,
}

impl SoundFontRenderer {
    pub fn from_file(path: &Path, sample_rate: u32) -> Result<Self, RenderError> {
        let mut file = File::open(path)?;
        let sound_font = SoundFont::new(&mut file)
            .map_err(|e| RenderError::SoundFont(format!("{}: {e}", path.display())))?;
        tracing::info!(soundfont = %path.display(), sample_rate, "soundfont loaded");
        Ok(Self {
            sound_font: Arc::new(sound_font),
            sample_rate,
        })
    }
}

impl AudioRenderer for SoundFontRenderer {
    fn render(&self, midi_bytes: &[u8]) -> Result<Vec<u8>, RenderError> {
        // The note-event container goes through a scoped temp file that is
        // removed on every exit path when the guard drops.
        let mut container = NamedTempFile::new()?;
        container.write_all(midi_bytes)?;
        container.flush()?;

        let mut reader = File::open(container.path())?;
        let midi = Arc::new(
            MidiFile::new(&mut reader)
                .map_err(|e| RenderError::Synthesis(format!("invalid MIDI container: {e}")))?,
        );

        let settings = SynthesizerSettings::new(self.sample_rate as i32);
        let synthesizer = Synthesizer::new(&self.sound_font, &settings)
            .map_err(|e| RenderError::Synthesis(format!("synthesizer init: {e}")))?;

        let mut sequencer = MidiFileSequencer::new(synthesizer);
        sequencer.play(&midi, false);

        let total_time = midi.get_length() + DECAY_SECONDS;
        let sample_count = (self.sample_rate as f64 * total_time) as usize;

        let mut left = vec![0f32; sample_count];
        let mut right = vec![0f32; sample_count];
        sequencer.render(&mut left[..], &mut right[..]);

        samples_to_wav(&left, &right, self.sample_rate)
    }
}

/// Encode stereo float samples as a 16-bit PCM WAV.
fn samples_to_wav(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Vec<u8>, RenderError> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)
        .map_err(|e| RenderError::Synthesis(format!("WAV encoding: {e}")))?;

    for (&l, &r) in left.iter().zip(right.iter()) {
        let l_sample = (l.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        let r_sample = (r.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(l_sample)
            .and_then(|()| writer.write_sample(r_sample))
            .map_err(|e| RenderError::Synthesis(format!("WAV encoding: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| RenderError::Synthesis(format!("WAV encoding: {e}")))?;

    Ok(cursor.into_inner())
}

/// Amplitude samples normalized to [-1,1] for lightweight visualization.
///
/// Extension point: currently always empty, and callers must tolerate an
/// empty result.
pub fn waveform_preview(_wav_bytes: &[u8]) -> Vec<f32> {
    Vec::new()
}
