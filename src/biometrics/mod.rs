//! Biometric matching
//!
//! Feature extraction, sample digests and fuzzy scoring for the voice and
//! iris modalities, plus the enrollment records they are compared against.
//! Everything here is synchronous and free of I/O except the stores.

pub mod digest;
pub mod features;
pub mod frame;
pub mod liveness;
pub mod matcher;
pub mod scorer;
pub mod store;

pub use digest::{SampleDigest, SampleHasher};
pub use features::{
    FeatureExtractor, FeatureVector, IrisFeatureExtractor, Modality, VoiceFeatureExtractor,
};
pub use frame::Frame;
pub use liveness::{CaptureSignals, LivenessConfig, LivenessGate, LivenessRejection};
pub use matcher::{MatchError, ModalityMatcher};
pub use scorer::{MatchResult, Similarity, SimilarityScorer};
pub use store::{
    EncryptedFileStore, EnrollmentRecord, EnrollmentStore, MemoryEnrollmentStore, StoreError,
};

/// Voice matcher type used by the authentication pipeline
pub type VoiceMatcher = ModalityMatcher<VoiceFeatureExtractor>;

/// Iris matcher type used by the authentication pipeline
pub type IrisMatcher = ModalityMatcher<IrisFeatureExtractor>;
