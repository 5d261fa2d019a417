//! Device unlock capability
//!
//! The platform call that actually unlocks the device lives outside this
//! crate. `SimulatedDevice` stands in for it in the CLI and in tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnlockError {
    #[error("Device unlock rejected: {0}")]
    Rejected(String),
}

pub trait UnlockCapability: Send + Sync {
    fn unlock(&self) -> Result<(), UnlockError>;

    fn device_is_locked(&self) -> bool;

    /// True when the device has a secure lock screen (PIN, pattern, password)
    fn device_is_secure(&self) -> bool;
}

#[derive(Debug)]
pub struct SimulatedDevice {
    locked: AtomicBool,
    secure: bool,
    reject_unlock: bool,
    unlock_calls: AtomicUsize,
}

impl SimulatedDevice {
    /// A locked device with a secure lock screen
    pub fn locked() -> Self {
        Self {
            locked: AtomicBool::new(true),
            secure: true,
            reject_unlock: false,
            unlock_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Make every unlock call fail, e.g. when the platform refuses
    pub fn rejecting_unlock(mut self) -> Self {
        self.reject_unlock = true;
        self
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn unlock_calls(&self) -> usize {
        self.unlock_calls.load(Ordering::SeqCst)
    }
}

impl UnlockCapability for SimulatedDevice {
    fn unlock(&self) -> Result<(), UnlockError> {
        self.unlock_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_unlock {
            return Err(UnlockError::Rejected("simulated rejection".to_string()));
        }
        self.locked.store(false, Ordering::SeqCst);
        log::info!("[SIM] Device unlocked");
        Ok(())
    }

    fn device_is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    fn device_is_secure(&self) -> bool {
        self.secure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_unlock() {
        let device = SimulatedDevice::locked();
        assert!(device.device_is_locked());
        device.unlock().unwrap();
        assert!(!device.device_is_locked());
        assert_eq!(device.unlock_calls(), 1);

        device.lock();
        assert!(device.device_is_locked());
    }

    #[test]
    fn test_rejecting_device_stays_locked() {
        let device = SimulatedDevice::locked().rejecting_unlock();
        assert!(device.unlock().is_err());
        assert!(device.device_is_locked());
    }
}
