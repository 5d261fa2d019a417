//! Progress reporting
//!
//! The orchestrator's only observable output besides its return value.
//! Every transition is announced before the step's work starts.

use super::error::{AuthError, AuthStep};
use crate::biometrics::Modality;
use serde::Serialize;
use tokio::sync::mpsc;

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, step: AuthStep, message: &str);

    fn on_success(&self);

    /// Authentication failures only; cancellation is never reported here
    fn on_failure(&self, reason: &AuthError);

    fn on_setup_required(&self, _modality: Modality) {}
}

/// Serializable form of the sink callbacks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress { step: AuthStep, message: String },
    Success,
    Failure { reason: String },
    SetupRequired { modality: Modality },
}

/// Writes progress to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn on_progress(&self, step: AuthStep, message: &str) {
        log::info!("[{}] {}", step, message);
    }

    fn on_success(&self) {
        log::info!("✓ Authentication succeeded");
    }

    fn on_failure(&self, reason: &AuthError) {
        log::warn!("✗ Authentication failed: {}", reason);
    }

    fn on_setup_required(&self, modality: Modality) {
        log::warn!("Setup required: {} is not enrolled", modality);
    }
}

/// Forwards events over an unbounded channel, e.g. to a UI task
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ProgressEvent) {
        // Receiver gone means nobody is watching; not an error for the pipeline
        let _ = self.tx.send(event);
    }
}

impl ProgressSink for ChannelProgressSink {
    fn on_progress(&self, step: AuthStep, message: &str) {
        self.send(ProgressEvent::Progress {
            step,
            message: message.to_string(),
        });
    }

    fn on_success(&self) {
        self.send(ProgressEvent::Success);
    }

    fn on_failure(&self, reason: &AuthError) {
        self.send(ProgressEvent::Failure {
            reason: reason.to_string(),
        });
    }

    fn on_setup_required(&self, modality: Modality) {
        self.send(ProgressEvent::SetupRequired { modality });
    }
}
