//! Single-frame liveness gate
//!
//! Known limitation: the gate looks at one face scan only. It checks that
//! both eyes are open and the head faces the camera, but does not track
//! blinks or any other motion across frames, so a high-quality static
//! image of an open-eyed face can pass it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Both eye-open probabilities must be strictly above this
    pub eye_open_threshold: f64,
    /// Maximum absolute head pose angle, in degrees
    pub max_pose_angle_deg: f64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            eye_open_threshold: 0.70,
            max_pose_angle_deg: 15.0,
        }
    }
}

/// Per-capture signals reported by the face detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureSignals {
    pub eye_open_left: f64,
    pub eye_open_right: f64,
    pub pose_angle_deg: f64,
}

/// Why a capture was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LivenessRejection {
    LeftEyeClosed(f64),
    RightEyeClosed(f64),
    PoseOffCenter(f64),
    InvalidSignal,
}

impl fmt::Display for LivenessRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftEyeClosed(p) => write!(f, "left eye open probability {:.2} too low", p),
            Self::RightEyeClosed(p) => write!(f, "right eye open probability {:.2} too low", p),
            Self::PoseOffCenter(a) => write!(f, "head pose {:.1} degrees off center", a),
            Self::InvalidSignal => f.write_str("non-finite capture signal"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LivenessGate {
    config: LivenessConfig,
}

impl LivenessGate {
    pub fn new(config: LivenessConfig) -> Self {
        Self { config }
    }

    pub fn is_live(&self, signals: &CaptureSignals) -> bool {
        self.evaluate(signals).is_ok()
    }

    /// Accept the capture or report the first failing criterion
    pub fn evaluate(&self, signals: &CaptureSignals) -> Result<(), LivenessRejection> {
        let CaptureSignals {
            eye_open_left,
            eye_open_right,
            pose_angle_deg,
        } = *signals;

        if !(eye_open_left.is_finite() && eye_open_right.is_finite() && pose_angle_deg.is_finite())
        {
            return Err(LivenessRejection::InvalidSignal);
        }
        if eye_open_left <= self.config.eye_open_threshold {
            return Err(LivenessRejection::LeftEyeClosed(eye_open_left));
        }
        if eye_open_right <= self.config.eye_open_threshold {
            return Err(LivenessRejection::RightEyeClosed(eye_open_right));
        }
        if pose_angle_deg.abs() > self.config.max_pose_angle_deg {
            return Err(LivenessRejection::PoseOffCenter(pose_angle_deg));
        }
        Ok(())
    }
}
