//! Lumen Core - Core types and utilities for the Lumen engine
//!
//! This crate provides the foundational pieces shared by the scheduler and its hosts:
//! - Frame clock with fixed-step accumulation
//! - Scheduler configuration (TOML)
//! - Math primitives (re-exported from glam)

pub mod config;
pub mod time;

pub use config::{ConfigError, FixedStepPolicy, SchedulerConfig};
pub use glam::{Vec2, Vec3};
pub use time::{FrameClock, FrameTime};
