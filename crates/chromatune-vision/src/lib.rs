//! Visual feature extraction for Chromatune.
//!
//! Turns a decoded color image into a small fixed feature vector that the
//! composition pipeline maps onto musical controls: a 12-bucket hue
//! histogram, mean saturation and value, edge density, and grayscale
//! texture variance.

mod features;

pub use features::{extract_features, ImageFeatures, HUE_BUCKETS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    /// The input bytes could not be decoded into a pixel matrix.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}
