//! Playground settings with persistence
//!
//! Settings are read from the path given on the command line, or from
//! `~/.config/lumen/playground.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use lumen_core::SchedulerConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All playground settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundSettings {
    pub scheduler: SchedulerConfig,
    pub run: RunSettings,
}

impl PlaygroundSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lumen"))
    }

    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("playground.toml"))
    }

    /// Load settings from `path`, or from the default location when `None`.
    /// Falls back to defaults when the file is missing or invalid.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory");
                    return Self::default();
                }
            },
        };

        if !path.exists() {
            info!("No settings file at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to load settings: {:#}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.scheduler.validate()?;
        if settings.run.frame_time <= 0.0 {
            anyhow::bail!("run.frame_time must be positive");
        }
        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::default_path() else {
            anyhow::bail!("Could not determine config directory");
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// How the playground drives the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Number of frames to simulate
    pub frames: u32,
    /// Simulated wall time per frame in seconds
    pub frame_time: f64,
    /// Wanderers spawned over the run
    pub wanderers: u32,
    /// Seed for spawn positions; random when absent
    pub seed: Option<u64>,
    /// Systems enabled by name before the first frame, exempt from auto-management
    pub force_enabled_systems: Vec<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_time: 1.0 / 60.0,
            wanderers: 32,
            seed: None,
            force_enabled_systems: Vec::new(),
        }
    }
}
