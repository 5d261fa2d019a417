//! Deterministic feature extraction for the voice and iris modalities
//!
//! Both extractors are pure: the same sample always produces the same
//! vector, and neither keeps any state between calls. Callers must reject
//! empty samples before extraction (see [`CaptureSample::is_blank`]).

use super::frame::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side length of the normalized frame the iris extractor works on
pub const IRIS_NORMALIZED_SIZE: u32 = 64;

/// Adjacent-pixel luma delta above which a pair counts as an edge
pub const EDGE_LUMA_THRESHOLD: f64 = 30.0;

/// Mirrored-pixel luma delta at or below which a pair counts as symmetric
pub const SYMMETRY_LUMA_TOLERANCE: f64 = 20.0;

/// Radial sampling: ring spacing in pixels and angular step in degrees
pub const RADIAL_STEP_PX: u32 = 4;
pub const RADIAL_STEP_DEG: u32 = 15;

/// A biometric factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Voice,
    Iris,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Voice, Modality::Iris];

    /// Number of dimensions every vector of this modality carries
    pub fn feature_len(self) -> usize {
        match self {
            Modality::Voice => 6,
            Modality::Iris => 9,
        }
    }

    /// Fixed key under which the enrollment record is stored
    pub fn storage_key(self) -> &'static str {
        match self {
            Modality::Voice => "voice_enrollment",
            Modality::Iris => "iris_enrollment",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Voice => "voice",
            Modality::Iris => "iris",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered feature values. Position is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest absolute component, 0 for an empty vector
    pub fn max_abs(&self) -> f64 {
        self.0.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// A raw capture that can be checked for emptiness before extraction
pub trait CaptureSample {
    fn is_blank(&self) -> bool;
}

impl CaptureSample for str {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl CaptureSample for Frame {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Raw sample → fixed-length feature vector
pub trait FeatureExtractor: Send + Sync {
    type Sample: CaptureSample + ?Sized;

    fn modality(&self) -> Modality;

    fn extract(&self, sample: &Self::Sample) -> FeatureVector;
}

/// Text-derived voice features.
///
/// The voice sample is the recognizer's transcript of the spoken phrase.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceFeatureExtractor;

impl FeatureExtractor for VoiceFeatureExtractor {
    type Sample = str;

    fn modality(&self) -> Modality {
        Modality::Voice
    }

    fn extract(&self, text: &str) -> FeatureVector {
        let length = text.chars().count() as f64;

        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len() as f64;
        let mean_word_len = if words.is_empty() {
            0.0
        } else {
            words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count
        };

        let mut distinct: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
        distinct.sort_unstable();
        distinct.dedup();

        let (mut vowels, mut consonants, mut upper, mut lower) = (0usize, 0usize, 0usize, 0usize);
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            if matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u') {
                vowels += 1;
            } else {
                consonants += 1;
            }
            if c.is_uppercase() {
                upper += 1;
            } else if c.is_lowercase() {
                lower += 1;
            }
        }

        FeatureVector(vec![
            length,
            mean_word_len,
            word_count,
            distinct.len() as f64,
            vowels as f64 / consonants.max(1) as f64,
            upper as f64 / lower.max(1) as f64,
        ])
    }
}

/// Image statistics over a size-normalized eye frame
#[derive(Debug, Clone, Copy)]
pub struct IrisFeatureExtractor {
    size: u32,
}

impl Default for IrisFeatureExtractor {
    fn default() -> Self {
        Self {
            size: IRIS_NORMALIZED_SIZE,
        }
    }
}

impl FeatureExtractor for IrisFeatureExtractor {
    type Sample = Frame;

    fn modality(&self) -> Modality {
        Modality::Iris
    }

    fn extract(&self, frame: &Frame) -> FeatureVector {
        let img = frame.resized(self.size, self.size);
        let (w, h) = (img.width(), img.height());
        let n = (w * h) as f64;

        let mut luma = Vec::with_capacity((w * h) as usize);
        let mut channel_sum = [0.0f64; 3];
        for y in 0..h {
            for x in 0..w {
                let px = img.pixel(x, y);
                for (sum, v) in channel_sum.iter_mut().zip(px) {
                    *sum += v as f64;
                }
                luma.push(img.luma(x, y));
            }
        }
        let at = |x: u32, y: u32| luma[(y * w + x) as usize];

        let brightness = luma.iter().sum::<f64>() / n;
        let variance = luma.iter().map(|l| (l - brightness).powi(2)).sum::<f64>() / n;
        let contrast = variance.sqrt();

        // Horizontal and vertical neighbour pairs
        let mut edges = 0usize;
        let mut pairs = 0usize;
        for y in 0..h {
            for x in 0..w {
                if x + 1 < w {
                    pairs += 1;
                    if (at(x, y) - at(x + 1, y)).abs() > EDGE_LUMA_THRESHOLD {
                        edges += 1;
                    }
                }
                if y + 1 < h {
                    pairs += 1;
                    if (at(x, y) - at(x, y + 1)).abs() > EDGE_LUMA_THRESHOLD {
                        edges += 1;
                    }
                }
            }
        }
        let edge_density = ratio(edges, pairs);

        let mut symmetric = 0usize;
        let mut mirrored = 0usize;
        for y in 0..h {
            for x in 0..w / 2 {
                mirrored += 1;
                if (at(x, y) - at(w - 1 - x, y)).abs() <= SYMMETRY_LUMA_TOLERANCE {
                    symmetric += 1;
                }
            }
        }
        let symmetry = ratio(symmetric, mirrored);

        let (radial_mean, radial_spread) = radial_pattern(&img, &at);

        FeatureVector(vec![
            brightness,
            contrast,
            channel_sum[0] / n,
            channel_sum[1] / n,
            channel_sum[2] / n,
            edge_density,
            symmetry,
            radial_mean,
            radial_spread,
        ])
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Mean and standard deviation of luma sampled on concentric rings
/// around the frame centre
fn radial_pattern(img: &Frame, at: &impl Fn(u32, u32) -> f64) -> (f64, f64) {
    let (w, h) = (img.width(), img.height());
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let max_radius = w.min(h) / 2;

    let mut samples = Vec::new();
    let mut radius = RADIAL_STEP_PX;
    while radius <= max_radius {
        for step in 0..(360 / RADIAL_STEP_DEG) {
            let theta = ((step * RADIAL_STEP_DEG) as f64).to_radians();
            let x = (cx + radius as f64 * theta.cos()).round();
            let y = (cy + radius as f64 * theta.sin()).round();
            if x >= 0.0 && y >= 0.0 && (x as u32) < w && (y as u32) < h {
                samples.push(at(x as u32, y as u32));
            }
        }
        radius += RADIAL_STEP_PX;
    }

    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let count = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / count;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count;
    (mean, variance.sqrt())
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn voice_extraction_is_deterministic(s in "\\PC{1,64}") {
            let a = VoiceFeatureExtractor.extract(&s);
            let b = VoiceFeatureExtractor.extract(&s.clone());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn iris_extraction_is_deterministic(
            w in 1u32..24,
            h in 1u32..24,
            seed in any::<u8>(),
        ) {
            let frame = Frame::from_fn(w, h, |x, y| {
                let v = (x as u8).wrapping_mul(31).wrapping_add((y as u8).wrapping_mul(17)) ^ seed;
                [v, v.wrapping_add(40), v.wrapping_sub(40)]
            });
            let extractor = IrisFeatureExtractor::default();
            prop_assert_eq!(extractor.extract(&frame), extractor.extract(&frame));
        }
    }
}
