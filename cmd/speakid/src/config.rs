//! Configuration management.
//!
//! Configuration is stored in ~/.speakid/config.yaml:
//!
//! ```yaml
//! store: /home/me/.speakid/data/enrollment.redb
//! calibration:
//!   margin: 1.1
//!   cap: 0.7
//!   default_threshold: 0.7
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use speakid_voiceprint::CalibratorConfig;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".speakid";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Default enrollment database filename, under `<base>/data`.
pub const DEFAULT_STORE_FILE: &str = "enrollment.redb";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Enrollment database path. Unset means `<config dir>/data/enrollment.redb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,

    /// Threshold calibration parameters.
    #[serde(default)]
    pub calibration: CalibratorConfig,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Resolves the enrollment database path. `override_path` (the `--store`
    /// flag) wins over the config file.
    pub fn store_path(&self, override_path: Option<&str>) -> PathBuf {
        if let Some(p) = override_path {
            return PathBuf::from(p);
        }
        if let Some(p) = &self.store {
            return p.clone();
        }
        let dir = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        dir.join("data").join(DEFAULT_STORE_FILE)
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }
}

/// Loads configuration, creating an empty config file if none exists.
pub fn load_config(custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    // Ensure config directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        }
    } else {
        let cfg = Config::default();
        let content = serde_yaml::to_string(&cfg)?;
        std::fs::write(&config_path, content)?;
        cfg
    };

    cfg.config_path = config_path;
    Ok(cfg)
}
