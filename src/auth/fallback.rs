//! Fallback escalation
//!
//! Alternate unlock paths for when the voice + iris pipeline cannot
//! complete. The ranking is recomputed on every call from what the device
//! currently supports.
//!
//! PIN is a placeholder: it always succeeds. There is no PIN storage or
//! comparison anywhere in this crate.

use crate::capture::CaptureError;
use crate::device::UnlockCapability;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fallback methods in priority order (highest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMethod {
    /// Platform biometric prompt (fingerprint, face)
    Biometric,
    /// Device lock-screen credential
    DeviceCredential,
    Pin,
}

impl fmt::Display for FallbackMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackMethod::Biometric => "biometric",
            FallbackMethod::DeviceCredential => "device_credential",
            FallbackMethod::Pin => "pin",
        })
    }
}

/// Fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Escalate automatically when the biometric pipeline fails
    pub escalate_on_failure: bool,
    /// Maximum time a platform prompt may stay open (ms)
    pub prompt_timeout_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            escalate_on_failure: false,
            prompt_timeout_ms: 30_000,
        }
    }
}

/// Platform prompts used by the biometric and credential fallbacks
#[async_trait]
pub trait FallbackAuthenticator: Send + Sync {
    fn biometric_available(&self) -> bool;

    /// `Ok(true)` when the user passed the platform biometric prompt
    async fn prompt_biometric(&self, cancel: CancellationToken) -> Result<bool, CaptureError>;

    /// `Ok(true)` when the user entered the correct lock-screen credential
    async fn prompt_device_credential(
        &self,
        cancel: CancellationToken,
    ) -> Result<bool, CaptureError>;
}

/// Result of running one fallback method
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackResult {
    Success,
    Failure(String),
    /// The method is not supported on this device right now
    Unavailable,
    Cancelled,
}

/// Result of escalating through all available methods
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    Succeeded(FallbackMethod),
    Exhausted,
    Cancelled,
}

pub struct FallbackEscalation {
    device: Arc<dyn UnlockCapability>,
    authenticator: Arc<dyn FallbackAuthenticator>,
    prompt_timeout: Duration,
}

impl FallbackEscalation {
    pub fn new(
        config: &FallbackConfig,
        device: Arc<dyn UnlockCapability>,
        authenticator: Arc<dyn FallbackAuthenticator>,
    ) -> Self {
        Self {
            device,
            authenticator,
            prompt_timeout: Duration::from_millis(config.prompt_timeout_ms),
        }
    }

    /// Methods usable right now, highest priority first. PIN is always last.
    pub fn available_methods(&self) -> Vec<FallbackMethod> {
        let mut methods = Vec::with_capacity(3);
        if self.authenticator.biometric_available() {
            methods.push(FallbackMethod::Biometric);
        }
        if self.device.device_is_secure() {
            methods.push(FallbackMethod::DeviceCredential);
        }
        methods.push(FallbackMethod::Pin);
        methods
    }

    pub async fn execute(
        &self,
        method: FallbackMethod,
        cancel: &CancellationToken,
    ) -> FallbackResult {
        if !self.available_methods().contains(&method) {
            log::warn!("Fallback method {} not available", method);
            return FallbackResult::Unavailable;
        }

        log::info!("Running fallback method: {}", method);
        let token = cancel.child_token();
        let prompt = async {
            match method {
                FallbackMethod::Biometric => {
                    self.authenticator.prompt_biometric(token.clone()).await
                }
                FallbackMethod::DeviceCredential => {
                    self.authenticator
                        .prompt_device_credential(token.clone())
                        .await
                }
                FallbackMethod::Pin => {
                    log::warn!("PIN fallback accepted without verification");
                    Ok(true)
                }
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FallbackResult::Cancelled,
            result = tokio::time::timeout(self.prompt_timeout, prompt) => result,
        };

        match result {
            Ok(Ok(true)) => FallbackResult::Success,
            Ok(Ok(false)) => FallbackResult::Failure(format!("{} rejected", method)),
            Ok(Err(CaptureError::Cancelled)) => FallbackResult::Cancelled,
            Ok(Err(CaptureError::Unavailable(detail))) => FallbackResult::Failure(detail),
            Err(_) => {
                token.cancel();
                FallbackResult::Failure(format!("{} prompt timeout", method))
            }
        }
    }

    /// Try each available method in priority order until one succeeds
    pub async fn escalate(&self, cancel: &CancellationToken) -> EscalationOutcome {
        for method in self.available_methods() {
            match self.execute(method, cancel).await {
                FallbackResult::Success => {
                    log::info!("Fallback succeeded via {}", method);
                    return EscalationOutcome::Succeeded(method);
                }
                FallbackResult::Cancelled => return EscalationOutcome::Cancelled,
                FallbackResult::Failure(reason) => {
                    log::warn!("Fallback {} failed: {}", method, reason);
                }
                FallbackResult::Unavailable => {}
            }
        }
        EscalationOutcome::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::stub::{Script, ScriptedFallback};
    use crate::device::SimulatedDevice;

    fn escalation(device: SimulatedDevice, prompts: ScriptedFallback) -> FallbackEscalation {
        FallbackEscalation::new(
            &FallbackConfig::default(),
            Arc::new(device),
            Arc::new(prompts),
        )
    }

    #[test]
    fn test_methods_ranked_by_capability() {
        let all = escalation(SimulatedDevice::locked(), ScriptedFallback::new(true));
        assert_eq!(
            all.available_methods(),
            vec![
                FallbackMethod::Biometric,
                FallbackMethod::DeviceCredential,
                FallbackMethod::Pin
            ]
        );

        let bare = escalation(
            SimulatedDevice::locked().with_secure(false),
            ScriptedFallback::new(false),
        );
        assert_eq!(bare.available_methods(), vec![FallbackMethod::Pin]);
    }

    #[test]
    fn test_priority_order() {
        assert!(FallbackMethod::Biometric < FallbackMethod::DeviceCredential);
        assert!(FallbackMethod::DeviceCredential < FallbackMethod::Pin);
    }

    #[tokio::test]
    async fn test_pin_always_succeeds() {
        let esc = escalation(SimulatedDevice::locked(), ScriptedFallback::new(false));
        assert_eq!(
            esc.execute(FallbackMethod::Pin, &CancellationToken::new()).await,
            FallbackResult::Success
        );
    }

    #[tokio::test]
    async fn test_unavailable_method() {
        let esc = escalation(SimulatedDevice::locked(), ScriptedFallback::new(false));
        assert_eq!(
            esc.execute(FallbackMethod::Biometric, &CancellationToken::new())
                .await,
            FallbackResult::Unavailable
        );
    }

    #[tokio::test]
    async fn test_escalation_stops_at_first_success() {
        let prompts = Arc::new(
            ScriptedFallback::new(true)
                .biometric(Script::Respond(false))
                .credential(Script::Respond(true)),
        );
        let esc = FallbackEscalation::new(
            &FallbackConfig::default(),
            Arc::new(SimulatedDevice::locked()),
            prompts.clone(),
        );

        assert_eq!(
            esc.escalate(&CancellationToken::new()).await,
            EscalationOutcome::Succeeded(FallbackMethod::DeviceCredential)
        );
        assert_eq!(prompts.call_count("prompt_biometric"), 1);
        assert_eq!(prompts.call_count("prompt_device_credential"), 1);
    }

    #[tokio::test]
    async fn test_escalation_falls_through_to_pin() {
        let esc = escalation(
            SimulatedDevice::locked(),
            ScriptedFallback::new(true)
                .biometric(Script::Fail(CaptureError::Unavailable("sensor".into())))
                .credential(Script::Respond(false)),
        );
        assert_eq!(
            esc.escalate(&CancellationToken::new()).await,
            EscalationOutcome::Succeeded(FallbackMethod::Pin)
        );
    }

    #[tokio::test]
    async fn test_escalation_cancelled() {
        let esc = escalation(
            SimulatedDevice::locked(),
            ScriptedFallback::new(true).biometric(Script::Hang),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(esc.escalate(&cancel).await, EscalationOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_timeout_is_a_failure() {
        let esc = escalation(
            SimulatedDevice::locked().with_secure(false),
            ScriptedFallback::new(true).biometric(Script::Hang),
        );
        assert_eq!(
            esc.execute(FallbackMethod::Biometric, &CancellationToken::new())
                .await,
            FallbackResult::Failure("biometric prompt timeout".to_string())
        );
    }
}
