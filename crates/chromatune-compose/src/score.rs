//! Score assembly.
//!
//! Builds the five-part symbolic score: one whole-bar chord accompaniment
//! part plus four melodic parts (dominant instrument first, then three
//! support instruments), each filled by cycling the rhythm sequence over
//! the motif with a fixed transposition and volume shaping per position.

use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use crate::params::CompositionParams;
use crate::ComposeError;

/// General MIDI instrument table: display name to program number.
pub const INSTRUMENT_TABLE: &[(&str, u8)] = &[
    ("Acoustic Grand Piano", 0),
    ("Electric Guitar (jazz)", 26),
    ("Acoustic Guitar (nylon)", 24),
    ("Violin", 40),
    ("Trumpet", 56),
    ("Alto Sax", 65),
    ("Flute", 73),
    ("Synth Pad", 88),
    ("Steel Drums", 114),
    ("Drum Kit", 118),
];

/// Semitone offsets per melodic part position.
pub const TRANSPOSITIONS: [i32; 4] = [0, 3, -3, 7];

/// Support instruments drawn per score.
pub const SUPPORT_COUNT: usize = 3;

/// One note or chord event: simultaneous pitches, duration in beat units,
/// and a velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub pitches: Vec<u8>,
    pub beats: f64,
    pub velocity: u8,
}

/// One instrument's event sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub instrument: String,
    pub program: u8,
    pub events: Vec<NoteEvent>,
}

impl Part {
    /// Total duration of this part's events in beat units.
    pub fn total_beats(&self) -> f64 {
        self.events.iter().map(|e| e.beats).sum()
    }
}

/// The assembled symbolic score: tempo plus an ordered set of parts.
///
/// Part 0 is the chord accompaniment; parts 1..=4 are melodic, dominant
/// instrument first.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub bpm: u32,
    /// Filled length in beat units.
    pub effective_len: u32,
    pub parts: Vec<Part>,
}

impl Score {
    /// Melodic instrument names in part order, dominant first.
    pub fn melodic_instruments(&self) -> Vec<String> {
        self.parts
            .iter()
            .skip(1)
            .map(|p| p.instrument.clone())
            .collect()
    }

    /// Composition length in seconds at the score's tempo.
    pub fn duration_secs(&self) -> f64 {
        self.effective_len as f64 / 4.0 * (60.0 / self.bpm.max(1) as f64)
    }
}

fn lookup_program(name: &str) -> Option<u8> {
    INSTRUMENT_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, p)| p)
}

fn clamp_velocity(v: i32) -> u8 {
    v.clamp(0, 127) as u8
}

/// Assemble the score from derived parameters, progression, and motif.
///
/// Fails with [`ComposeError::UnknownInstrument`] when the dominant name
/// is not in the table, and [`ComposeError::InsufficientInstruments`]
/// when fewer than three support candidates remain after excluding it.
pub fn compose_score(
    params: &CompositionParams,
    progression: &[[u8; 3]; 4],
    motif: &[u8],
    dominant: &str,
    note_len: u32,
    rng: &mut Pcg32,
) -> Result<Score, ComposeError> {
    let dominant_program = lookup_program(dominant)
        .ok_or_else(|| ComposeError::UnknownInstrument(dominant.to_string()))?;

    let effective_len = (note_len as f64 * params.note_density * 4.0).floor() as u32;
    let bars = effective_len / 4;

    // Whole-bar chord accompaniment at half volume.
    let chord_velocity = clamp_velocity((params.base_volume as f64 * 0.5) as i32);
    let chord_part = Part {
        instrument: "Acoustic Grand Piano".to_string(),
        program: 0,
        events: (0..bars)
            .map(|i| NoteEvent {
                pitches: progression[i as usize % progression.len()].to_vec(),
                beats: 4.0,
                velocity: chord_velocity,
            })
            .collect(),
    };

    let mut candidates: Vec<&(&str, u8)> = INSTRUMENT_TABLE
        .iter()
        .filter(|(name, _)| *name != dominant)
        .collect();
    if candidates.len() < SUPPORT_COUNT {
        return Err(ComposeError::InsufficientInstruments {
            available: candidates.len(),
            needed: SUPPORT_COUNT,
        });
    }
    let (support, _) = candidates.partial_shuffle(rng, SUPPORT_COUNT);

    let mut lineup: Vec<(String, u8)> = vec![(dominant.to_string(), dominant_program)];
    lineup.extend(support.iter().map(|&&(name, program)| (name.to_string(), program)));

    let mut parts = vec![chord_part];
    for (position, (instrument, program)) in lineup.into_iter().enumerate() {
        let transposition = TRANSPOSITIONS[position];
        let velocity = clamp_velocity(
            (params.base_volume as f64 * (1.2 - position as f64 * 0.3)) as i32,
        );
        parts.push(Part {
            instrument,
            program,
            events: fill_part(motif, params.rhythm, effective_len, transposition, velocity),
        });
    }

    Ok(Score {
        bpm: params.bpm,
        effective_len,
        parts,
    })
}

/// Fill one melodic part by cycling the rhythm sequence over the motif.
///
/// The final event is clipped so the running total lands exactly on
/// `effective_len` beats.
fn fill_part(
    motif: &[u8],
    rhythm: &[f64],
    effective_len: u32,
    transposition: i32,
    velocity: u8,
) -> Vec<NoteEvent> {
    let target = effective_len as f64;
    let mut events = Vec::new();
    let mut total = 0.0;
    let mut index = 0usize;

    while total < target {
        let mut beats = rhythm[index % rhythm.len()];
        if total + beats > target {
            beats = target - total;
        }
        let pitch = (motif[index % motif.len()] as i32 + transposition).clamp(0, 127) as u8;
        events.push(NoteEvent {
            pitches: vec![pitch],
            beats,
            velocity,
        });
        total += beats;
        index += 1;
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RHYTHM_DENSE, RHYTHM_MEDIUM, RHYTHM_SPARSE};
    use crate::rng::create_rng;
    use crate::theory::{build_scale, chord_progression, ScaleMode};
    use pretty_assertions::assert_eq;

    fn test_params(rhythm: &'static [f64]) -> CompositionParams {
        CompositionParams {
            bpm: 120,
            base_volume: 100,
            note_density: 1.0,
            rhythm,
        }
    }

    fn test_progression() -> [[u8; 3]; 4] {
        chord_progression(&build_scale(ScaleMode::Major, 60))
    }

    const MOTIF: [u8; 8] = [60, 62, 64, 65, 67, 69, 71, 72];

    #[test]
    fn score_has_five_parts() {
        let score = compose_score(
            &test_params(RHYTHM_MEDIUM),
            &test_progression(),
            &MOTIF,
            "Violin",
            32,
            &mut create_rng(0),
        )
        .unwrap();
        assert_eq!(score.parts.len(), 5);
        assert_eq!(score.parts[1].instrument, "Violin");
    }

    #[test]
    fn support_instruments_are_distinct_and_exclude_dominant() {
        for seed in 0..20 {
            let score = compose_score(
                &test_params(RHYTHM_SPARSE),
                &test_progression(),
                &MOTIF,
                "Flute",
                32,
                &mut create_rng(seed),
            )
            .unwrap();
            let names = score.melodic_instruments();
            assert_eq!(names.len(), 4);
            assert_eq!(names[0], "Flute");
            for (i, a) in names.iter().enumerate() {
                for b in names.iter().skip(i + 1) {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn melodic_parts_sum_exactly_to_effective_len() {
        for rhythm in [RHYTHM_SPARSE, RHYTHM_MEDIUM, RHYTHM_DENSE] {
            for note_len in [1u32, 7, 32, 64] {
                let params = CompositionParams {
                    bpm: 90,
                    base_volume: 80,
                    note_density: 0.73,
                    rhythm,
                };
                let score = compose_score(
                    &params,
                    &test_progression(),
                    &MOTIF,
                    "Trumpet",
                    note_len,
                    &mut create_rng(11),
                )
                .unwrap();
                let target = score.effective_len as f64;
                for part in &score.parts[1..] {
                    assert!(
                        (part.total_beats() - target).abs() < 1e-9,
                        "part {} sums to {} not {}",
                        part.instrument,
                        part.total_beats(),
                        target
                    );
                }
            }
        }
    }

    #[test]
    fn final_event_is_clipped() {
        // effective_len 5 with sparse rhythm [4, 2]: second event clips to 1.
        let params = CompositionParams {
            bpm: 100,
            base_volume: 90,
            note_density: 1.0,
            rhythm: RHYTHM_SPARSE,
        };
        let events = fill_part(&MOTIF, params.rhythm, 5, 0, 80);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].beats, 4.0);
        assert_eq!(events[1].beats, 1.0);
    }

    #[test]
    fn chord_part_cycles_progression_at_half_volume() {
        let score = compose_score(
            &test_params(RHYTHM_MEDIUM),
            &test_progression(),
            &MOTIF,
            "Violin",
            32,
            &mut create_rng(2),
        )
        .unwrap();
        let chords = &score.parts[0];
        // note_len 32 at density 1.0 -> 128 beats -> 32 bars
        assert_eq!(chords.events.len(), 32);
        assert_eq!(chords.events[0].pitches, test_progression()[0].to_vec());
        assert_eq!(chords.events[4].pitches, test_progression()[0].to_vec());
        assert_eq!(chords.events[0].velocity, 50);
        assert_eq!(chords.events[0].beats, 4.0);
    }

    #[test]
    fn transposition_and_volume_shaping_by_position() {
        let motif = [60u8; 8];
        let score = compose_score(
            &test_params(RHYTHM_SPARSE),
            &test_progression(),
            &motif,
            "Violin",
            8,
            &mut create_rng(4),
        )
        .unwrap();
        let expected_pitches = [60, 63, 57, 67];
        // Truncation of 1.2 - 0.3*i times base volume; allow one step of
        // float slack below the nominal value.
        let nominal_velocities = [120i32, 90, 60, 30];
        for (i, part) in score.parts[1..].iter().enumerate() {
            assert_eq!(part.events[0].pitches, vec![expected_pitches[i]]);
            let velocity = part.events[0].velocity as i32;
            assert!(
                velocity == nominal_velocities[i] || velocity == nominal_velocities[i] - 1,
                "part {i} velocity {velocity}"
            );
        }
    }

    #[test]
    fn unknown_dominant_is_rejected() {
        let err = compose_score(
            &test_params(RHYTHM_MEDIUM),
            &test_progression(),
            &MOTIF,
            "Theremin",
            32,
            &mut create_rng(0),
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownInstrument(_)));
    }

    #[test]
    fn same_seed_same_score() {
        let a = compose_score(
            &test_params(RHYTHM_DENSE),
            &test_progression(),
            &MOTIF,
            "Alto Sax",
            32,
            &mut create_rng(77),
        )
        .unwrap();
        let b = compose_score(
            &test_params(RHYTHM_DENSE),
            &test_progression(),
            &MOTIF,
            "Alto Sax",
            32,
            &mut create_rng(77),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duration_formula() {
        let score = compose_score(
            &test_params(RHYTHM_MEDIUM),
            &test_progression(),
            &MOTIF,
            "Violin",
            32,
            &mut create_rng(0),
        )
        .unwrap();
        // 128 beats / 4 * 60/120 = 16 seconds
        assert!((score.duration_secs() - 16.0).abs() < 1e-9);
    }
}
