//! Per-attempt session state
//!
//! A session lives for exactly one authentication attempt and is dropped
//! once it reaches a terminal state. Nothing here is persisted.

use super::error::{AuthError, AuthStep};
use super::fallback::FallbackMethod;
use crate::biometrics::Modality;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Pipeline state
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Idle,
    WakeWordWait,
    VoiceAuth,
    EyeScan,
    LivenessCheck,
    IrisAuth,
    Unlocking,
    Complete,
    Failed(AuthError),
    /// Stopped by the caller; not an authentication failure
    Cancelled,
    /// A modality has no enrollment record yet
    SetupRequired(Modality),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthState::Complete
                | AuthState::Failed(_)
                | AuthState::Cancelled
                | AuthState::SetupRequired(_)
        )
    }

    /// The step whose work runs while in this state
    pub fn step(&self) -> Option<AuthStep> {
        match self {
            AuthState::WakeWordWait => Some(AuthStep::WakeWord),
            AuthState::VoiceAuth => Some(AuthStep::VoiceAuth),
            AuthState::EyeScan => Some(AuthStep::EyeScan),
            AuthState::LivenessCheck => Some(AuthStep::LivenessCheck),
            AuthState::IrisAuth => Some(AuthStep::IrisAuth),
            AuthState::Unlocking => Some(AuthStep::Unlocking),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepTiming {
    pub step: AuthStep,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct AuthSession {
    state: AuthState,
    step_timings: Vec<StepTiming>,
    last_error: Option<AuthError>,
    entered_at: Instant,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession {
    pub fn new() -> Self {
        Self {
            state: AuthState::Idle,
            step_timings: Vec::new(),
            last_error: None,
            entered_at: Instant::now(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn step_timings(&self) -> &[StepTiming] {
        &self.step_timings
    }

    pub fn last_error(&self) -> Option<&AuthError> {
        self.last_error.as_ref()
    }

    /// Move to `next`, closing the timing of the step being left.
    ///
    /// Terminal states are sticky: once reached, further transitions are
    /// ignored.
    pub(crate) fn transition(&mut self, next: AuthState) {
        if self.state.is_terminal() {
            log::warn!(
                "Ignoring transition {:?} -> {:?} from terminal state",
                self.state,
                next
            );
            return;
        }

        let now = Instant::now();
        if let Some(step) = self.state.step() {
            self.step_timings.push(StepTiming {
                step,
                elapsed: now.duration_since(self.entered_at),
            });
        }

        match &next {
            AuthState::Failed(e) => self.last_error = Some(e.clone()),
            AuthState::Cancelled => self.last_error = Some(AuthError::Cancelled),
            AuthState::SetupRequired(m) => self.last_error = Some(AuthError::NoEnrollment(*m)),
            _ => {}
        }

        log::debug!("Auth state: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.entered_at = now;
    }
}

/// Terminal result of one authentication attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// Both factors matched and the device was unlocked
    Unlocked,
    /// The biometric pipeline failed but a fallback method succeeded
    UnlockedByFallback(FallbackMethod),
    Failed(AuthError),
    /// Silent stop requested by the caller
    Cancelled,
    SetupRequired(Modality),
}

impl AuthOutcome {
    pub fn is_unlocked(&self) -> bool {
        matches!(
            self,
            AuthOutcome::Unlocked | AuthOutcome::UnlockedByFallback(_)
        )
    }
}
