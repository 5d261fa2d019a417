use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

/// Application paths following OS conventions
#[derive(Clone, Debug)]
pub struct AppPaths {
    /// Configuration directory (config.toml)
    pub config: PathBuf,
    /// Data directory (encrypted enrollment records)
    pub data: PathBuf,
    /// Cache directory (logs)
    pub cache: PathBuf,
}

impl AppPaths {
    /// Resolve OS-specific paths for Emberlock
    ///
    /// # Platform Paths
    ///
    /// ## Linux
    /// - Config: `~/.config/emberlock/`
    /// - Data: `~/.local/share/emberlock/` → enrollments/
    /// - Cache: `~/.cache/emberlock/`
    ///
    /// ## macOS
    /// - Config: `~/Library/Application Support/com.LotusEmberLabs.Emberlock/`
    /// - Data: `~/Library/Application Support/com.LotusEmberLabs.Emberlock/`
    /// - Cache: `~/Library/Caches/com.LotusEmberLabs.Emberlock/`
    ///
    /// ## Windows
    /// - Config: `%APPDATA%\LotusEmberLabs\Emberlock\config\`
    /// - Data: `%APPDATA%\LotusEmberLabs\Emberlock\data\`
    /// - Cache: `%LOCALAPPDATA%\LotusEmberLabs\Emberlock\cache\`
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "LotusEmberLabs", "Emberlock")
            .context("Failed to determine project directories")?;

        Ok(Self {
            config: proj_dirs.config_dir().to_path_buf(),
            data: proj_dirs.data_dir().to_path_buf(),
            cache: proj_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Root everything under one directory, e.g. for `--home` or tests
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config: root.join("config"),
            data: root.join("data"),
            cache: root.join("cache"),
        }
    }

    /// Create all necessary directories
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.config).context("Failed to create config directory")?;
        fs::create_dir_all(self.enrollments_dir())
            .context("Failed to create enrollments directory")?;
        fs::create_dir_all(&self.cache).context("Failed to create cache directory")?;

        log::info!("Application directories initialized");
        log::debug!("  Config: {}", self.config.display());
        log::debug!("  Data:   {}", self.data.display());
        log::debug!("  Cache:  {}", self.cache.display());

        Ok(())
    }

    /// Get path to config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Get path to encrypted enrollment records
    pub fn enrollments_dir(&self) -> PathBuf {
        self.data.join("enrollments")
    }
}
