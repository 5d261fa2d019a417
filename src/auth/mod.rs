//! Authentication pipeline
//!
//! Sequences wake word → voice match → eye scan → liveness → iris match →
//! unlock, with a timeout on every capture and cooperative cancellation.

pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod progress;
pub mod session;

use crate::validation::{
    validate_threshold, validate_timeout_ms, validate_wake_phrase, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{AuthError, AuthStep};
pub use fallback::{
    EscalationOutcome, FallbackAuthenticator, FallbackConfig, FallbackEscalation, FallbackMethod,
    FallbackResult,
};
pub use orchestrator::AuthOrchestrator;
pub use progress::{ChannelProgressSink, LogProgressSink, ProgressEvent, ProgressSink};
pub use session::{AuthOutcome, AuthSession, AuthState, StepTiming};

/// Thresholds, timeouts and wake phrase for the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Phrase the wake-word utterance must contain (case-insensitive)
    pub wake_phrase: String,
    /// Minimum overall similarity for the voice factor
    pub voice_threshold: f64,
    /// Minimum overall similarity for the iris factor
    pub iris_threshold: f64,
    pub wake_word_timeout_ms: u64,
    pub voice_capture_timeout_ms: u64,
    pub eye_scan_timeout_ms: u64,
    pub iris_capture_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            wake_phrase: "open phone".to_string(),
            voice_threshold: 0.85,
            iris_threshold: 0.80,
            wake_word_timeout_ms: 10_000,
            voice_capture_timeout_ms: 10_000,
            eye_scan_timeout_ms: 15_000,
            iris_capture_timeout_ms: 5_000,
        }
    }
}

impl AuthConfig {
    /// Capture budget for `step`. Steps without a capture get no budget.
    pub fn timeout(&self, step: AuthStep) -> Duration {
        let ms = match step {
            AuthStep::WakeWord => self.wake_word_timeout_ms,
            AuthStep::VoiceAuth => self.voice_capture_timeout_ms,
            AuthStep::EyeScan => self.eye_scan_timeout_ms,
            AuthStep::IrisAuth => self.iris_capture_timeout_ms,
            AuthStep::LivenessCheck | AuthStep::Unlocking => 0,
        };
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_wake_phrase(&self.wake_phrase)?;
        validate_threshold("voice_threshold", self.voice_threshold)?;
        validate_threshold("iris_threshold", self.iris_threshold)?;
        validate_timeout_ms("wake_word_timeout_ms", self.wake_word_timeout_ms)?;
        validate_timeout_ms("voice_capture_timeout_ms", self.voice_capture_timeout_ms)?;
        validate_timeout_ms("eye_scan_timeout_ms", self.eye_scan_timeout_ms)?;
        validate_timeout_ms("iris_capture_timeout_ms", self.iris_capture_timeout_ms)?;
        Ok(())
    }
}
