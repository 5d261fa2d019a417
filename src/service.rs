//! Authentication service
//!
//! Owns the orchestrator and fallback escalation for one device, enforces
//! the one-session-at-a-time rule and exposes enrollment management.

use crate::auth::{
    AuthError, AuthOrchestrator, AuthOutcome, AuthStep, EscalationOutcome, FallbackAuthenticator,
    FallbackEscalation, FallbackMethod, FallbackResult, ProgressSink,
};
use crate::biometrics::{
    EnrollmentRecord, EnrollmentStore, Frame, LivenessGate, MatchError, Modality, StoreError,
};
use crate::capture::{EyeCapture, VoiceCapture};
use crate::config::AppConfig;
use crate::device::UnlockCapability;
use crate::validation::{validate_voice_sample, ValidationError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("An authentication session is already running")]
    AlreadyActive,

    #[error("Authentication task aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("Cannot enroll while an authentication session is running")]
    SessionActive,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Match(#[from] MatchError),
}

/// External capabilities the service drives
#[derive(Clone)]
pub struct Collaborators {
    pub voice: Arc<dyn VoiceCapture>,
    pub eyes: Arc<dyn EyeCapture>,
    pub device: Arc<dyn UnlockCapability>,
    pub fallback: Arc<dyn FallbackAuthenticator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrollmentStatus {
    pub voice: bool,
    pub iris: bool,
}

impl EnrollmentStatus {
    pub fn is_complete(&self) -> bool {
        self.voice && self.iris
    }
}

struct ActiveSession {
    id: u64,
    cancel: CancellationToken,
}

type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;

/// Frees the session slot when the session it claimed ends
struct SessionGuard {
    slot: SessionSlot,
    id: u64,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().map(|s| s.id) == Some(self.id) {
            *slot = None;
        }
    }
}

/// Passes everything through except failures, which the service reports
/// itself once it knows whether escalation recovered the session
struct HoldFailures<'a>(&'a dyn ProgressSink);

impl ProgressSink for HoldFailures<'_> {
    fn on_progress(&self, step: AuthStep, message: &str) {
        self.0.on_progress(step, message);
    }

    fn on_success(&self) {
        self.0.on_success();
    }

    fn on_failure(&self, _reason: &AuthError) {}

    fn on_setup_required(&self, modality: Modality) {
        self.0.on_setup_required(modality);
    }
}

/// Handle to a session started with [`AuthService::start_session`]
pub struct SessionHandle {
    id: u64,
    cancel: CancellationToken,
    task: JoinHandle<AuthOutcome>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request a silent stop; the session resolves to `Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<AuthOutcome, SessionError> {
        self.task
            .await
            .map_err(|e| SessionError::Aborted(e.to_string()))
    }
}

pub struct AuthService {
    orchestrator: AuthOrchestrator,
    escalation: FallbackEscalation,
    device: Arc<dyn UnlockCapability>,
    escalate_on_failure: bool,
    active: SessionSlot,
    next_id: AtomicU64,
}

impl AuthService {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn EnrollmentStore>,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            voice,
            eyes,
            device,
            fallback,
        } = collaborators;

        let orchestrator = AuthOrchestrator::new(
            config.auth.clone(),
            LivenessGate::new(config.liveness.clone()),
            store,
            voice,
            eyes,
            device.clone(),
        );
        let escalation = FallbackEscalation::new(&config.fallback, device.clone(), fallback);

        Self {
            orchestrator,
            escalation,
            device,
            escalate_on_failure: config.fallback.escalate_on_failure,
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    // ===== Enrollment =====

    pub fn enroll_voice(&self, sample: &str) -> Result<EnrollmentRecord, EnrollError> {
        self.ensure_idle()?;
        let sample = validate_voice_sample(sample)?;
        Ok(self.orchestrator.voice_matcher().enroll(sample)?)
    }

    pub fn enroll_iris(&self, frame: &Frame) -> Result<EnrollmentRecord, EnrollError> {
        self.ensure_idle()?;
        Ok(self.orchestrator.iris_matcher().enroll(frame)?)
    }

    pub fn is_enrolled(&self, modality: Modality) -> Result<bool, StoreError> {
        match modality {
            Modality::Voice => self.orchestrator.voice_matcher().is_enrolled(),
            Modality::Iris => self.orchestrator.iris_matcher().is_enrolled(),
        }
    }

    pub fn enrollment_status(&self) -> Result<EnrollmentStatus, StoreError> {
        Ok(EnrollmentStatus {
            voice: self.is_enrolled(Modality::Voice)?,
            iris: self.is_enrolled(Modality::Iris)?,
        })
    }

    pub fn clear_enrollment(&self, modality: Modality) -> Result<(), EnrollError> {
        self.ensure_idle()?;
        let cleared = match modality {
            Modality::Voice => self.orchestrator.voice_matcher().clear(),
            Modality::Iris => self.orchestrator.iris_matcher().clear(),
        };
        cleared.map_err(MatchError::from)?;
        log::info!("Cleared {} enrollment", modality);
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), EnrollError> {
        if self.session_active() {
            return Err(EnrollError::SessionActive);
        }
        Ok(())
    }

    // ===== Sessions =====

    pub fn session_active(&self) -> bool {
        let slot = self.active.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().is_some_and(|s| !s.cancel.is_cancelled())
    }

    /// Cancel the running session, if any. Returns whether one was running.
    pub fn cancel_active(&self) -> bool {
        let slot = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(session) if !session.cancel.is_cancelled() => {
                log::info!("Cancelling authentication session {}", session.id);
                session.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Reserve the session slot. A previous session must have been
    /// cancelled (or finished) first.
    fn claim(&self, cancel: &CancellationToken) -> Result<SessionGuard, SessionError> {
        let mut slot = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = slot.as_ref() {
            if !current.cancel.is_cancelled() {
                log::warn!("Refusing new session: session {} still running", current.id);
                return Err(SessionError::AlreadyActive);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *slot = Some(ActiveSession {
            id,
            cancel: cancel.clone(),
        });
        Ok(SessionGuard {
            slot: self.active.clone(),
            id,
        })
    }

    /// Run one session on the current task
    pub async fn authenticate(
        &self,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<AuthOutcome, SessionError> {
        let _guard = self.claim(&cancel)?;
        Ok(self.run_claimed(sink, &cancel).await)
    }

    /// Run one session on a spawned task
    pub fn start_session(
        self: &Arc<Self>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<SessionHandle, SessionError> {
        let cancel = CancellationToken::new();
        let guard = self.claim(&cancel)?;
        let id = guard.id;

        let service = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            service.run_claimed(sink.as_ref(), &token).await
        });

        log::info!("Started authentication session {}", id);
        Ok(SessionHandle { id, cancel, task })
    }

    /// With escalation enabled the sink sees at most one terminal callback:
    /// a biometric failure is only reported if the fallback does not recover it.
    async fn run_claimed(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> AuthOutcome {
        if !self.escalate_on_failure {
            return self.orchestrator.run(sink, cancel).await;
        }

        match self.orchestrator.run(&HoldFailures(sink), cancel).await {
            // Broken storage is not something a PIN should paper over
            AuthOutcome::Failed(reason) if reason.is_non_recoverable() => {
                log::error!("Not escalating non-recoverable failure: {}", reason);
                sink.on_failure(&reason);
                AuthOutcome::Failed(reason)
            }
            AuthOutcome::Failed(reason) => {
                log::info!("Biometric unlock failed ({}), escalating to fallback", reason);
                match self.unlock_with_fallback(cancel).await {
                    Ok(EscalationOutcome::Succeeded(method)) => {
                        sink.on_success();
                        AuthOutcome::UnlockedByFallback(method)
                    }
                    Ok(EscalationOutcome::Cancelled) => AuthOutcome::Cancelled,
                    Ok(EscalationOutcome::Exhausted) => {
                        sink.on_failure(&reason);
                        AuthOutcome::Failed(reason)
                    }
                    Err(e) => {
                        sink.on_failure(&e);
                        AuthOutcome::Failed(e)
                    }
                }
            }
            other => other,
        }
    }

    // ===== Fallback =====

    pub fn available_fallbacks(&self) -> Vec<FallbackMethod> {
        self.escalation.available_methods()
    }

    /// Run a single fallback method without unlocking
    pub async fn execute_fallback(
        &self,
        method: FallbackMethod,
        cancel: &CancellationToken,
    ) -> FallbackResult {
        self.escalation.execute(method, cancel).await
    }

    /// Escalate through the fallback methods and unlock on the first success
    pub async fn unlock_with_fallback(
        &self,
        cancel: &CancellationToken,
    ) -> Result<EscalationOutcome, AuthError> {
        let outcome = self.escalation.escalate(cancel).await;
        if let EscalationOutcome::Succeeded(method) = outcome {
            if self.device.device_is_locked() {
                self.device
                    .unlock()
                    .map_err(|e| AuthError::UnlockFailed(e.to_string()))?;
            }
            log::info!("Device unlocked via {} fallback", method);
        }
        Ok(outcome)
    }
}
