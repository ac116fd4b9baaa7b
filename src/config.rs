use crate::error::{TResult, TrackerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const WINDOW_SIZE: usize = 7;
pub const GRAVITY: f64 = 9.45; // resting magnitude used as the gain pivot
pub const GAIN: f64 = 2.5;
pub const ACCE_MAX_THRESHOLD: f64 = 10.5;
pub const STEP_MIN_PERIOD_MS: i64 = 300;
pub const DEFAULT_STEP_LENGTH_M: f64 = 0.65;
pub const FOOT_TICK_MS: u64 = 500;
pub const FOOT_TICK_DELAY_MS: u64 = 10;

/// Tuning parameters for the step pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub window_size: usize,
    pub gravity: f64,
    pub gain: f64,
    /// Filtered peaks at or below this are treated as noise
    pub peak_threshold: f64,
    pub step_min_period_ms: i64,
    pub step_length_m: f64,
    pub foot_tick_ms: u64,
    pub save: SaveSelection,
}

/// Which artifacts are written when a stopped session is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSelection {
    pub wifi: bool,
    pub accelerometer: bool,
    pub gyroscope: bool,
    pub magnetometer: bool,
    pub debug_streams: bool,
}

impl Default for SaveSelection {
    fn default() -> Self {
        Self {
            wifi: false,
            accelerometer: true,
            gyroscope: true,
            magnetometer: true,
            debug_streams: true,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            gravity: GRAVITY,
            gain: GAIN,
            peak_threshold: ACCE_MAX_THRESHOLD,
            step_min_period_ms: STEP_MIN_PERIOD_MS,
            step_length_m: DEFAULT_STEP_LENGTH_M,
            foot_tick_ms: FOOT_TICK_MS,
            save: SaveSelection::default(),
        }
    }
}

impl TrackerConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> TResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: TrackerConfig = serde_json::from_str(&text)
            .map_err(|e| TrackerError::InvalidParameters(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TResult<()> {
        if self.window_size == 0 {
            return Err(TrackerError::InvalidParameters(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !(self.step_length_m > 0.0) {
            return Err(TrackerError::InvalidParameters(format!(
                "step_length_m must be positive, got {}",
                self.step_length_m
            )));
        }
        if self.foot_tick_ms == 0 {
            return Err(TrackerError::InvalidParameters(
                "foot_tick_ms must be non-zero".to_string(),
            ));
        }
        if self.step_min_period_ms < 0 {
            return Err(TrackerError::InvalidParameters(
                "step_min_period_ms must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
