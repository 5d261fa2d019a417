use crate::auth::{AuthConfig, FallbackConfig};
use crate::biometrics::LivenessConfig;
use crate::validation::{validate_pose_angle, validate_threshold, validate_timeout_ms};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub liveness: LivenessConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

impl AppConfig {
    /// Load config from file or create default
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("Invalid config: {}", path.display()))?;
            log::info!("Config loaded from: {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            log::info!("Default config created at: {}", path.display());
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        validate_threshold("eye_open_threshold", self.liveness.eye_open_threshold)?;
        validate_pose_angle(self.liveness.max_pose_angle_deg)?;
        validate_timeout_ms("prompt_timeout_ms", self.fallback.prompt_timeout_ms)?;
        Ok(())
    }
}
