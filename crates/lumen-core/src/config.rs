//! Scheduler configuration
//!
//! Loaded from TOML by hosts; every field has a default so partial files are fine.

use serde::{Deserialize, Serialize};

/// How many fixed passes run when more than one fixed step elapsed in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedStepPolicy {
    /// One fixed pass per frame, however many steps overflowed. The overflow is still
    /// drained from the accumulator.
    Once,
    /// One fixed pass per elapsed step, capped at `max_fixed_steps`.
    #[default]
    CatchUp,
}

/// Configuration for the frame scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed update interval in seconds
    pub fixed_timestep: f64,
    /// Fixed pass repetition policy under lag
    pub fixed_step_policy: FixedStepPolicy,
    /// Upper bound of fixed passes per frame for `CatchUp`
    pub max_fixed_steps: u32,
    /// Raw frame deltas are clamped to this many seconds
    pub max_delta_time: f64,
    /// Game seconds per real second
    pub time_scale: f64,
    /// Whether systems are activated and purged from component population
    pub auto_system_management: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            fixed_step_policy: FixedStepPolicy::CatchUp,
            max_fixed_steps: 8,
            max_delta_time: 0.25,
            time_scale: 1.0,
            auto_system_management: true,
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fixed_timestep must be a positive number of seconds, got {}",
                self.fixed_timestep
            )));
        }
        if self.max_fixed_steps == 0 {
            return Err(ConfigError::Invalid(
                "max_fixed_steps must be at least 1".to_string(),
            ));
        }
        if !(self.max_delta_time.is_finite() && self.max_delta_time > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_delta_time must be a positive number of seconds, got {}",
                self.max_delta_time
            )));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "time_scale must be zero or positive, got {}",
                self.time_scale
            )));
        }
        Ok(())
    }
}

/// Errors produced while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse scheduler config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid scheduler config: {0}")]
    Invalid(String),
}
