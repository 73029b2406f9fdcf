//! Motif generation.
//!
//! Samples a short repeating pitch sequence from the scale, weighted by a
//! tf-idf transform of the hue histogram so rarer hues pull more weight.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_pcg::Pcg32;

use crate::theory::Scale;

/// Fixed motif length in pitches.
pub const MOTIF_LEN: usize = 8;

const EPSILON: f64 = 1e-6;

/// Sample an 8-pitch motif from the scale.
///
/// The histogram is turned into per-degree weights: `w = h * (ln(1/(h+eps)) + 1)`,
/// normalized, truncated to the scale length (zero-padded when the scale
/// has more degrees than histogram buckets), and renormalized. Pitches are
/// drawn with replacement through the supplied RNG.
pub fn generate_motif(hist: &[f32; 12], scale: &Scale, rng: &mut Pcg32) -> Vec<u8> {
    let tfidf: Vec<f64> = hist
        .iter()
        .map(|&h| {
            let h = h as f64;
            h * ((1.0 / (h + EPSILON)).ln() + 1.0)
        })
        .collect();

    let mut weights: Vec<f64> = (0..scale.len())
        .map(|i| tfidf.get(i).copied().unwrap_or(0.0))
        .collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }

    match WeightedIndex::new(&weights) {
        Ok(dist) => (0..MOTIF_LEN)
            .map(|_| scale.pitches[dist.sample(rng)])
            .collect(),
        // All histogram mass sits beyond the scale length; fall back to a
        // uniform draw over the scale.
        Err(_) => (0..MOTIF_LEN)
            .map(|_| scale.pitches[rng.gen_range(0..scale.len())])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use crate::theory::{build_scale, ScaleMode};
    use pretty_assertions::assert_eq;

    fn spread_hist() -> [f32; 12] {
        let mut hist = [0.0f32; 12];
        for (i, h) in hist.iter_mut().enumerate() {
            *h = (i as f32 + 1.0) / 12.0;
        }
        hist
    }

    #[test]
    fn motif_has_eight_pitches_from_the_scale() {
        let scale = build_scale(ScaleMode::Major, 60);
        let mut rng = create_rng(7);
        let motif = generate_motif(&spread_hist(), &scale, &mut rng);
        assert_eq!(motif.len(), MOTIF_LEN);
        for pitch in motif {
            assert!(scale.pitches.contains(&pitch));
        }
    }

    #[test]
    fn single_bucket_histogram_pins_the_root() {
        // All mass in bucket 0 -> only scale degree 0 has weight.
        let mut hist = [0.0f32; 12];
        hist[0] = 1.0;
        let scale = build_scale(ScaleMode::Pentatonic, 50);
        let mut rng = create_rng(1);
        let motif = generate_motif(&hist, &scale, &mut rng);
        assert_eq!(motif, vec![50; MOTIF_LEN]);
    }

    #[test]
    fn same_seed_same_motif() {
        let scale = build_scale(ScaleMode::Blues, 55);
        let a = generate_motif(&spread_hist(), &scale, &mut create_rng(99));
        let b = generate_motif(&spread_hist(), &scale, &mut create_rng(99));
        assert_eq!(a, b);
    }

    #[test]
    fn mass_beyond_scale_length_falls_back_to_uniform() {
        // Pentatonic has 5 degrees; all histogram mass sits in buckets 5+.
        let mut hist = [0.0f32; 12];
        hist[9] = 1.0;
        let scale = build_scale(ScaleMode::Pentatonic, 48);
        let mut rng = create_rng(3);
        let motif = generate_motif(&hist, &scale, &mut rng);
        assert_eq!(motif.len(), MOTIF_LEN);
        for pitch in motif {
            assert!(scale.pitches.contains(&pitch));
        }
    }

    #[test]
    fn works_for_every_mode() {
        for mode in ScaleMode::ALL {
            let scale = build_scale(mode, 60);
            let motif = generate_motif(&spread_hist(), &scale, &mut create_rng(5));
            assert_eq!(motif.len(), MOTIF_LEN);
        }
    }
}
