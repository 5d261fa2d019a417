/**
 * Input Validation
 *
 * Range and format checks for configuration values and externally
 * supplied samples. Violations are reported, never clamped.
 */
use thiserror::Error;

/// Longest accepted wake phrase, in characters
pub const MAX_WAKE_PHRASE_LEN: usize = 64;

/// Upper bound for any single capture step timeout
pub const MAX_STEP_TIMEOUT_MS: u64 = 60_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Value too long: max {max}, got {actual}")]
    ValueTooLong { max: usize, actual: usize },
}

/// Validate a similarity or probability threshold (0.0 to 1.0)
pub fn validate_threshold(name: &str, threshold: f64) -> Result<f64, ValidationError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ValidationError::InvalidRange(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, threshold
        )));
    }
    Ok(threshold)
}

/// Validate a step timeout in milliseconds (1ms to 60s)
pub fn validate_timeout_ms(name: &str, timeout_ms: u64) -> Result<u64, ValidationError> {
    if !(1..=MAX_STEP_TIMEOUT_MS).contains(&timeout_ms) {
        return Err(ValidationError::InvalidRange(format!(
            "{} must be between 1ms and {}ms, got {}ms",
            name, MAX_STEP_TIMEOUT_MS, timeout_ms
        )));
    }
    Ok(timeout_ms)
}

/// Validate the pose centering bound in degrees (0 to 90)
pub fn validate_pose_angle(angle_deg: f64) -> Result<f64, ValidationError> {
    if !(0.0..=90.0).contains(&angle_deg) {
        return Err(ValidationError::InvalidRange(format!(
            "Pose angle bound must be between 0 and 90 degrees, got {}",
            angle_deg
        )));
    }
    Ok(angle_deg)
}

/// Validate the wake phrase (non-blank, max 64 chars, no control characters)
pub fn validate_wake_phrase(phrase: &str) -> Result<String, ValidationError> {
    if phrase.trim().is_empty() {
        return Err(ValidationError::InvalidFormat(
            "Wake phrase cannot be empty".to_string(),
        ));
    }

    let len = phrase.chars().count();
    if len > MAX_WAKE_PHRASE_LEN {
        return Err(ValidationError::ValueTooLong {
            max: MAX_WAKE_PHRASE_LEN,
            actual: len,
        });
    }

    if phrase.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat(
            "Wake phrase contains invalid control characters".to_string(),
        ));
    }

    Ok(phrase.to_string())
}

/// Validate an enrollment voice phrase before it reaches the extractor
pub fn validate_voice_sample(text: &str) -> Result<&str, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::InvalidFormat(
            "Voice sample cannot be empty".to_string(),
        ));
    }
    Ok(text)
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn wake_phrase_rejects_controls(s in r"[\x00-\x1F\x7F]{1,16}") {
            assert!(validate_wake_phrase(&s).is_err());
        }

        #[test]
        fn wake_phrase_accepts_reasonable_ascii(s in r"[A-Za-z0-9][A-Za-z0-9 _\-]{0,63}") {
            assert!(validate_wake_phrase(&s).is_ok());
        }

        #[test]
        fn threshold_in_unit_interval(x in 0.0f64..1.0) {
            assert!(validate_threshold("t", x).is_ok());
        }

        #[test]
        fn threshold_outside_unit_interval(
            x in any::<f64>().prop_filter("out of [0,1]", |v| *v < 0.0 || *v > 1.0)
        ) {
            assert!(validate_threshold("t", x).is_err());
        }

        #[test]
        fn timeout_outside_valid_range(
            x in any::<u64>().prop_filter("out of [1,60000]", |v| *v < 1 || *v > 60_000)
        ) {
            assert!(validate_timeout_ms("t", x).is_err());
        }
    }
}
