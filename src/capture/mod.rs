//! Capture collaborators
//!
//! The engine never touches microphones or cameras directly. It asks these
//! traits for samples and hands each call a cancellation token; when the
//! token fires (session cancelled or step timed out) the implementation
//! must stop capturing and release the hardware.
//!
//! `stub` provides scripted implementations for development and tests.

use crate::biometrics::{CaptureSignals, Frame};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod stub;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Hardware busy, missing or permission denied
    #[error("Capture unavailable: {0}")]
    Unavailable(String),

    /// The capture was stopped through its cancellation token or by the user
    #[error("Capture cancelled")]
    Cancelled,
}

/// One face-detector result: liveness signals plus the frame they came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceScan {
    pub signals: CaptureSignals,
    pub frame: Frame,
}

/// Microphone side of the pipeline.
///
/// `timeout` is the budget the orchestrator will enforce; implementations
/// may use it to size their listening window.
#[async_trait]
pub trait VoiceCapture: Send + Sync {
    /// Listen for a short utterance and return its transcript
    async fn listen_for_phrase(
        &self,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<String, CaptureError>;

    /// Record the voice print sample used for speaker matching
    async fn capture_print(
        &self,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<String, CaptureError>;
}

/// Camera side of the pipeline
#[async_trait]
pub trait EyeCapture: Send + Sync {
    /// Stream frames until a face is found and report its liveness signals
    async fn scan_face(
        &self,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<FaceScan, CaptureError>;

    /// Grab a single high-resolution eye frame for iris matching
    async fn capture_high_res_frame(
        &self,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Frame, CaptureError>;
}
