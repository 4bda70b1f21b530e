//! Frame time tracking for the Lumen scheduler
//!
//! Accumulates elapsed wall-clock time and decides how many fixed-step passes a frame runs.

use crate::config::{FixedStepPolicy, SchedulerConfig};

/// Timing snapshot for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Frame number, starting at 1 for the first frame
    pub frame: u64,
    /// Scaled and clamped delta for this frame, in seconds
    pub delta: f64,
    /// Clamped delta before time scaling
    pub unscaled_delta: f64,
    /// Scaled time since the clock started
    pub total: f64,
    /// Length of one fixed step
    pub fixed_timestep: f64,
    /// Fixed passes this frame runs
    pub fixed_steps: u32,
    /// Whole fixed steps that elapsed this frame, before the policy was applied
    pub fixed_overflow: u32,
    /// Accumulator fraction left over, for render interpolation
    pub alpha: f64,
}

/// Game clock with a fixed-step accumulator
#[derive(Debug, Clone)]
pub struct FrameClock {
    fixed_timestep: f64,
    policy: FixedStepPolicy,
    max_fixed_steps: u32,
    max_delta_time: f64,
    time_scale: f64,
    paused: bool,
    total_time: f64,
    frame_count: u64,
    accumulator: f64,
    last: FrameTime,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}

impl FrameClock {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            fixed_timestep: config.fixed_timestep,
            policy: config.fixed_step_policy,
            max_fixed_steps: config.max_fixed_steps.max(1),
            max_delta_time: config.max_delta_time,
            time_scale: config.time_scale.max(0.0),
            paused: false,
            total_time: 0.0,
            frame_count: 0,
            accumulator: 0.0,
            last: FrameTime {
                fixed_timestep: config.fixed_timestep,
                ..Default::default()
            },
        }
    }

    /// Advance by the raw delta reported by the host and return this frame's timing.
    pub fn advance(&mut self, raw_delta: f64) -> FrameTime {
        let unscaled = raw_delta.max(0.0).min(self.max_delta_time);
        let unscaled = if unscaled.is_finite() { unscaled } else { 0.0 };
        self.frame_count += 1;

        let delta = if self.paused {
            0.0
        } else {
            unscaled * self.time_scale
        };
        self.total_time += delta;
        self.accumulator += delta;

        let overflow = self.drain_overflow();
        let fixed_steps = match self.policy {
            _ if overflow == 0 => 0,
            FixedStepPolicy::Once => 1,
            FixedStepPolicy::CatchUp => overflow.min(self.max_fixed_steps),
        };

        self.last = FrameTime {
            frame: self.frame_count,
            delta,
            unscaled_delta: unscaled,
            total: self.total_time,
            fixed_timestep: self.fixed_timestep,
            fixed_steps,
            fixed_overflow: overflow,
            alpha: self.fixed_interpolation(),
        };
        self.last
    }

    /// Remove every whole step from the accumulator, returning how many there were.
    fn drain_overflow(&mut self) -> u32 {
        if self.accumulator < self.fixed_timestep {
            return 0;
        }
        let overflow = (self.accumulator / self.fixed_timestep).floor();
        self.accumulator -= self.fixed_timestep * overflow;
        overflow as u32
    }

    /// Timing of the most recent frame
    pub fn last(&self) -> FrameTime {
        self.last
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Time waiting in the accumulator for the next fixed step
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Interpolation factor between the previous and next fixed step
    pub fn fixed_interpolation(&self) -> f64 {
        self.accumulator / self.fixed_timestep
    }

    pub fn policy(&self) -> FixedStepPolicy {
        self.policy
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Set the time scale (0.0 = frozen, 1.0 = normal, 2.0 = double speed)
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }
}
