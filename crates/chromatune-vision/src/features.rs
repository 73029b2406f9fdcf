use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::VisionError;

/// Number of buckets in the hue histogram.
pub const HUE_BUCKETS: usize = 12;

/// Dual-threshold edge detection levels on a 0-255 intensity scale.
const EDGE_LOW: f32 = 100.0;
const EDGE_HIGH: f32 = 200.0;

/// Quantitative visual features of one image.
///
/// Computed once per request and immutable thereafter. Saturation and
/// value are on a 0-255 scale; edge density is a fraction in [0,1];
/// texture variance is the population variance of grayscale intensity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFeatures {
    /// 12-bucket hue histogram, min-max normalized to [0,1].
    pub hue_histogram: [f32; HUE_BUCKETS],
    pub mean_saturation: f32,
    pub mean_value: f32,
    pub edge_density: f32,
    pub texture_variance: f32,
}

/// Decode an image payload and extract its feature vector.
pub fn extract_features(bytes: &[u8]) -> Result<ImageFeatures, VisionError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| VisionError::InvalidImage(e.to_string()))?
        .to_rgb8();
    Ok(ImageFeatures::from_image(&img))
}

impl ImageFeatures {
    /// Extract features from an already-decoded RGB image.
    pub fn from_image(img: &RgbImage) -> Self {
        let pixel_count = (img.width() as u64 * img.height() as u64).max(1) as f64;

        let mut histogram = [0u64; HUE_BUCKETS];
        let mut sat_sum = 0.0f64;
        let mut val_sum = 0.0f64;
        let mut gray = vec![0.0f32; img.width() as usize * img.height() as usize];

        for (i, pixel) in img.pixels().enumerate() {
            let [r, g, b] = pixel.0;
            let (h, s, v) = rgb_to_hsv(r, g, b);
            histogram[hue_bucket(h)] += 1;
            sat_sum += s as f64;
            val_sum += v as f64;
            gray[i] = luminance(r, g, b);
        }

        let mean = gray.iter().map(|&g| g as f64).sum::<f64>() / pixel_count;
        let variance = gray
            .iter()
            .map(|&g| {
                let d = g as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / pixel_count;

        ImageFeatures {
            hue_histogram: normalize_histogram(&histogram),
            mean_saturation: (sat_sum / pixel_count) as f32,
            mean_value: (val_sum / pixel_count) as f32,
            edge_density: edge_density(&gray, img.width() as usize, img.height() as usize),
            texture_variance: variance as f32,
        }
    }
}

/// Convert an RGB pixel to HSV with hue in degrees [0,360) and
/// saturation/value on a 0-255 scale.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max * 255.0 };
    (hue, saturation, max * 255.0)
}

/// BT.601 luminance on a 0-255 scale.
fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

fn hue_bucket(hue: f32) -> usize {
    let bucket = (hue / (360.0 / HUE_BUCKETS as f32)) as usize;
    bucket.min(HUE_BUCKETS - 1)
}

/// Min-max normalize raw bucket counts into [0,1].
///
/// A degenerate histogram where every bucket holds the same count maps to
/// all ones: the image is a single flat distribution, and downstream
/// weighting still needs at least one positive entry.
fn normalize_histogram(counts: &[u64; HUE_BUCKETS]) -> [f32; HUE_BUCKETS] {
    let min = *counts.iter().min().unwrap_or(&0);
    let max = *counts.iter().max().unwrap_or(&0);
    let mut out = [0.0f32; HUE_BUCKETS];
    if max == min {
        if max > 0 {
            out = [1.0; HUE_BUCKETS];
        }
        return out;
    }
    let range = (max - min) as f32;
    for (o, &c) in out.iter_mut().zip(counts.iter()) {
        *o = (c - min) as f32 / range;
    }
    out
}

/// Fraction of pixels flagged as edges by a Sobel dual-threshold filter.
///
/// Gradient magnitudes at or above `EDGE_HIGH` are strong edges; pixels in
/// `[EDGE_LOW, EDGE_HIGH)` are kept only when 8-connected to a strong edge
/// (hysteresis). The image is smoothed with a 3x3 Gaussian first.
fn edge_density(gray: &[f32], width: usize, height: usize) -> f32 {
    if width < 3 || height < 3 {
        return 0.0;
    }

    let smoothed = gaussian_3x3(gray, width, height);

    // 0 = none, 1 = weak, 2 = strong
    let mut marks = vec![0u8; gray.len()];
    let mut strong: Vec<(usize, usize)> = Vec::new();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let at = |dx: isize, dy: isize| {
                smoothed[(y as isize + dy) as usize * width + (x as isize + dx) as usize]
            };
            let gx = -at(-1, -1) - 2.0 * at(-1, 0) - at(-1, 1)
                + at(1, -1)
                + 2.0 * at(1, 0)
                + at(1, 1);
            let gy = -at(-1, -1) - 2.0 * at(0, -1) - at(1, -1)
                + at(-1, 1)
                + 2.0 * at(0, 1)
                + at(1, 1);
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude >= EDGE_HIGH {
                marks[y * width + x] = 2;
                strong.push((x, y));
            } else if magnitude >= EDGE_LOW {
                marks[y * width + x] = 1;
            }
        }
    }

    // Hysteresis: promote weak edges reachable from a strong edge.
    let mut edge_count = 0u64;
    let mut stack = strong;
    let mut visited = vec![false; gray.len()];
    while let Some((x, y)) = stack.pop() {
        let idx = y * width + x;
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        edge_count += 1;
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let nidx = ny as usize * width + nx as usize;
                if !visited[nidx] && marks[nidx] > 0 {
                    stack.push((nx as usize, ny as usize));
                }
            }
        }
    }

    edge_count as f32 / (width * height) as f32
}

fn gaussian_3x3(gray: &[f32], width: usize, height: usize) -> Vec<f32> {
    const KERNEL: [[f32; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];
    let mut out = gray.to_vec();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = 0.0;
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, &k) in row.iter().enumerate() {
                    acc += k * gray[(y + ky - 1) * width + (x + kx - 1)];
                }
            }
            out[y * width + x] = acc / 16.0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn solid_red_lands_in_first_hue_bucket() {
        let features = ImageFeatures::from_image(&solid(16, 16, [255, 0, 0]));
        assert_eq!(features.hue_histogram[0], 1.0);
        for &h in &features.hue_histogram[1..] {
            assert_eq!(h, 0.0);
        }
        assert_eq!(features.mean_saturation, 255.0);
        assert_eq!(features.mean_value, 255.0);
    }

    #[test]
    fn solid_image_has_no_edges_or_texture() {
        let features = ImageFeatures::from_image(&solid(32, 32, [40, 80, 160]));
        assert_eq!(features.edge_density, 0.0);
        assert!(features.texture_variance < 1e-3);
    }

    #[test]
    fn hard_boundary_produces_edges_and_variance() {
        let mut img = solid(32, 32, [0, 0, 0]);
        for y in 0..32 {
            for x in 16..32 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let features = ImageFeatures::from_image(&img);
        assert!(features.edge_density > 0.0);
        assert!(features.edge_density < 0.5);
        assert!(features.texture_variance > 1000.0);
    }

    #[test]
    fn blue_hue_falls_in_expected_bucket() {
        // Pure blue sits at 240 degrees -> bucket 8 of 12.
        let features = ImageFeatures::from_image(&solid(8, 8, [0, 0, 255]));
        assert_eq!(features.hue_histogram[8], 1.0);
    }

    #[test]
    fn histogram_is_min_max_normalized() {
        // Half red, half blue: both buckets at max, the rest at min.
        let mut img = solid(16, 16, [255, 0, 0]);
        for y in 0..16 {
            for x in 8..16 {
                img.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }
        let features = ImageFeatures::from_image(&img);
        assert_eq!(features.hue_histogram[0], 1.0);
        assert_eq!(features.hue_histogram[8], 1.0);
        assert_eq!(features.hue_histogram[4], 0.0);
    }

    #[test]
    fn undecodable_bytes_are_invalid_image() {
        let err = extract_features(&[]).unwrap_err();
        assert!(matches!(err, VisionError::InvalidImage(_)));

        let err = extract_features(b"definitely not an image").unwrap_err();
        assert!(matches!(err, VisionError::InvalidImage(_)));
    }

    #[test]
    fn decodes_png_bytes() {
        let img = solid(4, 4, [0, 255, 0]);
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        let features = extract_features(&bytes).unwrap();
        // Pure green sits at 120 degrees -> bucket 4.
        assert_eq!(features.hue_histogram[4], 1.0);
    }

    #[test]
    fn rgb_to_hsv_known_values() {
        assert_eq!(rgb_to_hsv(255, 0, 0).0, 0.0);
        assert_eq!(rgb_to_hsv(0, 255, 0).0, 120.0);
        assert_eq!(rgb_to_hsv(0, 0, 255).0, 240.0);
        // Gray has no saturation.
        let (_, s, v) = rgb_to_hsv(128, 128, 128);
        assert_eq!(s, 0.0);
        assert!((v - 128.0).abs() < 1.0);
    }
}
