//! Scripted capture collaborators for development without hardware
//!
//! Each collaborator replays a queue of [`Script`] entries, one per call.
//! Every cancellation token handed in is recorded so callers can check
//! that the hardware would have been released.

use super::{CaptureError, EyeCapture, FaceScan, VoiceCapture};
use crate::auth::fallback::FallbackAuthenticator;
use crate::biometrics::Frame;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a scripted call does
#[derive(Debug, Clone)]
pub enum Script<T> {
    /// Resolve immediately
    Respond(T),
    /// Resolve after a delay unless cancelled first
    RespondAfter(Duration, T),
    /// Resolve immediately with an error
    Fail(CaptureError),
    /// Never resolve; only cancellation ends the call
    Hang,
}

async fn play<T>(script: Option<Script<T>>, cancel: CancellationToken) -> Result<T, CaptureError> {
    match script {
        None => Err(CaptureError::Unavailable(
            "no scripted response left".to_string(),
        )),
        Some(Script::Respond(value)) => Ok(value),
        Some(Script::RespondAfter(delay, value)) => {
            tokio::select! {
                _ = cancel.cancelled() => Err(CaptureError::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(value),
            }
        }
        Some(Script::Fail(e)) => Err(e),
        Some(Script::Hang) => {
            cancel.cancelled().await;
            Err(CaptureError::Cancelled)
        }
    }
}

/// Log of calls made against a scripted collaborator
#[derive(Debug, Default)]
struct CallLog {
    calls: Mutex<Vec<(&'static str, CancellationToken)>>,
}

impl CallLog {
    fn record(&self, op: &'static str, cancel: &CancellationToken) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((op, cancel.clone()));
        }
        log::debug!("[STUB] {}", op);
    }

    fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|(name, _)| *name == op).count())
            .unwrap_or(0)
    }

    fn tokens(&self) -> Vec<CancellationToken> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(_, token)| token.clone()).collect())
            .unwrap_or_default()
    }

    fn all_released(&self) -> bool {
        self.tokens().iter().all(|t| t.is_cancelled())
    }
}

fn next<T>(queue: &Mutex<VecDeque<Script<T>>>) -> Option<Script<T>> {
    queue.lock().ok().and_then(|mut q| q.pop_front())
}

/// Scripted microphone
#[derive(Debug, Default)]
pub struct ScriptedVoiceCapture {
    phrases: Mutex<VecDeque<Script<String>>>,
    prints: Mutex<VecDeque<Script<String>>>,
    log: CallLog,
}

impl ScriptedVoiceCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response to the next `listen_for_phrase` call
    pub fn phrase(self, script: Script<String>) -> Self {
        if let Ok(mut q) = self.phrases.lock() {
            q.push_back(script);
        }
        self
    }

    /// Queue the response to the next `capture_print` call
    pub fn print(self, script: Script<String>) -> Self {
        if let Ok(mut q) = self.prints.lock() {
            q.push_back(script);
        }
        self
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.log.count(op)
    }

    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.log.tokens()
    }

    /// True when every token handed to this capture has been cancelled
    pub fn all_released(&self) -> bool {
        self.log.all_released()
    }
}

#[async_trait]
impl VoiceCapture for ScriptedVoiceCapture {
    async fn listen_for_phrase(
        &self,
        _timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<String, CaptureError> {
        self.log.record("listen_for_phrase", &cancel);
        play(next(&self.phrases), cancel).await
    }

    async fn capture_print(
        &self,
        _timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<String, CaptureError> {
        self.log.record("capture_print", &cancel);
        play(next(&self.prints), cancel).await
    }
}

/// Scripted camera
#[derive(Debug, Default)]
pub struct ScriptedEyeCapture {
    scans: Mutex<VecDeque<Script<FaceScan>>>,
    frames: Mutex<VecDeque<Script<Frame>>>,
    log: CallLog,
}

impl ScriptedEyeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response to the next `scan_face` call
    pub fn scan(self, script: Script<FaceScan>) -> Self {
        if let Ok(mut q) = self.scans.lock() {
            q.push_back(script);
        }
        self
    }

    /// Queue the response to the next `capture_high_res_frame` call
    pub fn frame(self, script: Script<Frame>) -> Self {
        if let Ok(mut q) = self.frames.lock() {
            q.push_back(script);
        }
        self
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.log.count(op)
    }

    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.log.tokens()
    }
}

#[async_trait]
impl EyeCapture for ScriptedEyeCapture {
    async fn scan_face(
        &self,
        _timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<FaceScan, CaptureError> {
        self.log.record("scan_face", &cancel);
        play(next(&self.scans), cancel).await
    }

    async fn capture_high_res_frame(
        &self,
        _timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Frame, CaptureError> {
        self.log.record("capture_high_res_frame", &cancel);
        play(next(&self.frames), cancel).await
    }
}

/// Scripted platform prompts for the fallback paths
#[derive(Debug)]
pub struct ScriptedFallback {
    biometric_available: bool,
    biometric: Mutex<VecDeque<Script<bool>>>,
    credential: Mutex<VecDeque<Script<bool>>>,
    log: CallLog,
}

impl ScriptedFallback {
    pub fn new(biometric_available: bool) -> Self {
        Self {
            biometric_available,
            biometric: Mutex::new(VecDeque::new()),
            credential: Mutex::new(VecDeque::new()),
            log: CallLog::default(),
        }
    }

    pub fn biometric(self, script: Script<bool>) -> Self {
        if let Ok(mut q) = self.biometric.lock() {
            q.push_back(script);
        }
        self
    }

    pub fn credential(self, script: Script<bool>) -> Self {
        if let Ok(mut q) = self.credential.lock() {
            q.push_back(script);
        }
        self
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.log.count(op)
    }
}

#[async_trait]
impl FallbackAuthenticator for ScriptedFallback {
    fn biometric_available(&self) -> bool {
        self.biometric_available
    }

    async fn prompt_biometric(&self, cancel: CancellationToken) -> Result<bool, CaptureError> {
        self.log.record("prompt_biometric", &cancel);
        play(next(&self.biometric), cancel).await
    }

    async fn prompt_device_credential(
        &self,
        cancel: CancellationToken,
    ) -> Result<bool, CaptureError> {
        self.log.record("prompt_device_credential", &cancel);
        play(next(&self.credential), cancel).await
    }
}
