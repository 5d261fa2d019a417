//! Fuzzy similarity between a live capture and an enrollment record
//!
//! Captures are never bit-identical between enrollment and verification,
//! so acceptance is a continuous score compared against a per-modality
//! threshold rather than an equality test.

use super::digest::SampleDigest;
use super::features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Breakdown of a single comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    pub digest: f64,
    pub features: f64,
    /// Mean of `digest` and `features`
    pub overall: f64,
}

/// Result of scoring a live sample against a threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub similarity: Similarity,
    pub threshold: f64,
    pub authenticated: bool,
}

impl MatchResult {
    pub fn score(&self) -> f64 {
        self.similarity.overall
    }
}

/// Stateless scorer; all methods return values in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    /// Fraction of positions holding the same character.
    ///
    /// Digests of different length (or two empty digests) score 0.
    pub fn digest_similarity(a: &SampleDigest, b: &SampleDigest) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let equal = a
            .as_str()
            .bytes()
            .zip(b.as_str().bytes())
            .filter(|(x, y)| x == y)
            .count();
        equal as f64 / a.len() as f64
    }

    /// `1 - Σ|a_i - b_i| / (max|v| * len)`, clamped.
    ///
    /// Mismatched or empty vectors score 0. All-zero vectors are identical
    /// and score 1.
    pub fn feature_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let max_abs = a.max_abs().max(b.max_abs());
        if max_abs == 0.0 {
            return 1.0;
        }

        let distance: f64 = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y).abs())
            .sum();

        let similarity = 1.0 - distance / (max_abs * a.len() as f64);
        if similarity.is_nan() {
            0.0
        } else {
            similarity.clamp(0.0, 1.0)
        }
    }

    pub fn score(
        live_features: &FeatureVector,
        stored_features: &FeatureVector,
        live_digest: &SampleDigest,
        stored_digest: &SampleDigest,
    ) -> Similarity {
        let digest = Self::digest_similarity(live_digest, stored_digest);
        let features = Self::feature_similarity(live_features, stored_features);
        Similarity {
            digest,
            features,
            overall: (digest + features) / 2.0,
        }
    }

    /// Accept when the overall score reaches the threshold (inclusive)
    pub fn decide(similarity: Similarity, threshold: f64) -> MatchResult {
        MatchResult {
            similarity,
            threshold,
            authenticated: similarity.overall >= threshold,
        }
    }
}
