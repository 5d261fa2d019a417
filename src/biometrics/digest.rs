//! Coarse content digests of raw samples
//!
//! A [`SampleDigest`] is compared position by position, not for equality,
//! so it acts as a rough perceptual signal rather than a security hash.
//! Images are reduced to a small grid before hashing so that captures
//! differing only in resolution land on the same digest.

use super::features::{FeatureExtractor, IrisFeatureExtractor, VoiceFeatureExtractor};
use super::frame::Frame;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Side length of the grid images are reduced to before hashing
pub const DIGEST_GRID_SIZE: u32 = 32;

/// Hex-encoded SHA-256 length
pub const DIGEST_LEN: usize = 64;

/// Fixed-length hex digest of a canonical sample representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleDigest(String);

impl SampleDigest {
    /// Wrap an existing digest string (e.g. one read back from storage)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }
}

/// Raw sample → fixed-length digest
pub trait SampleHasher: FeatureExtractor {
    fn digest(&self, sample: &Self::Sample) -> SampleDigest;
}

impl SampleHasher for VoiceFeatureExtractor {
    fn digest(&self, text: &str) -> SampleDigest {
        SampleDigest::of_bytes(text.as_bytes())
    }
}

impl SampleHasher for IrisFeatureExtractor {
    fn digest(&self, frame: &Frame) -> SampleDigest {
        let grid = frame.resized(DIGEST_GRID_SIZE, DIGEST_GRID_SIZE);
        SampleDigest::of_bytes(grid.as_bytes())
    }
}
