use crate::biometrics::{LivenessRejection, Modality};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unit of work in the authentication pipeline, as reported to progress sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStep {
    WakeWord,
    VoiceAuth,
    EyeScan,
    LivenessCheck,
    IrisAuth,
    Unlocking,
}

impl AuthStep {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthStep::WakeWord => "wake_word",
            AuthStep::VoiceAuth => "voice_auth",
            AuthStep::EyeScan => "eye_scan",
            AuthStep::LivenessCheck => "liveness_check",
            AuthStep::IrisAuth => "iris_auth",
            AuthStep::Unlocking => "unlocking",
        }
    }

    /// Human-readable name of the capture this step waits on
    pub fn capture_label(self) -> &'static str {
        match self {
            AuthStep::WakeWord => "wake word",
            AuthStep::VoiceAuth => "voice capture",
            AuthStep::EyeScan => "eye scan",
            AuthStep::LivenessCheck => "liveness check",
            AuthStep::IrisAuth => "iris capture",
            AuthStep::Unlocking => "unlock",
        }
    }
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an authentication attempt stopped short of unlocking.
///
/// Display strings are the user-facing failure reasons.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("wake word not detected")]
    WakeWordNotDetected,

    #[error("{} timeout", .0.capture_label())]
    CaptureTimeout(AuthStep),

    #[error("{} unavailable: {detail}", .step.capture_label())]
    CaptureUnavailable { step: AuthStep, detail: String },

    /// Recorded as the session's last error when it ends in `SetupRequired`
    #[error("{0} not enrolled")]
    NoEnrollment(Modality),

    #[error("empty {0} sample")]
    EmptySample(Modality),

    #[error("{modality} authentication failed")]
    SimilarityBelowThreshold {
        modality: Modality,
        score: f64,
        threshold: f64,
    },

    #[error("liveness detection failed")]
    LivenessRejected(LivenessRejection),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("{modality} enrollment record corrupt: {detail}")]
    CorruptRecord { modality: Modality, detail: String },

    #[error("unlock failed: {0}")]
    UnlockFailed(String),

    #[error("cancelled")]
    Cancelled,
}

impl AuthError {
    /// Storage and record-shape failures: matching cannot be trusted at all
    pub fn is_non_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::StorageUnavailable(_) | AuthError::CorruptRecord { .. }
        )
    }
}
