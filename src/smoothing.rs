use crate::config::TrackerConfig;
use crate::types::{TimedScalar, TimestampMs};

/// Sliding-window mean over accelerometer magnitudes with gain around gravity.
///
/// The filtered value is stamped with the timestamp of the window's center
/// sample so the smoothed curve stays aligned with the raw one.
pub struct SignalFilter {
    raw: Vec<TimedScalar>,
    window_size: usize,
    gravity: f64,
    gain: f64,
}

impl SignalFilter {
    pub fn new(window_size: usize, gravity: f64, gain: f64) -> Self {
        SignalFilter {
            raw: Vec::new(),
            window_size,
            gravity,
            gain,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.window_size, config.gravity, config.gain)
    }

    /// Append one accelerometer sample; returns a filtered sample once the
    /// window is full (one output per input after warm-up)
    pub fn add_accelerometer_sample(
        &mut self,
        timestamp: TimestampMs,
        x: f64,
        y: f64,
        z: f64,
    ) -> Option<TimedScalar> {
        let magnitude = (x * x + y * y + z * z).sqrt();
        self.raw.push(TimedScalar::new(timestamp, magnitude));

        if self.raw.len() < self.window_size {
            return None;
        }

        let end = self.raw.len() - 1;
        let window = &self.raw[self.raw.len() - self.window_size..];
        let avg = window.iter().map(|s| s.value).sum::<f64>() / self.window_size as f64;
        let filtered = (avg - self.gravity) * self.gain + self.gravity;
        let center = self.raw[end - self.window_size / 2].timestamp;

        Some(TimedScalar::new(center, filtered))
    }

    /// Raw magnitude history for the current session
    pub fn raw_magnitudes(&self) -> &[TimedScalar] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }
}

impl Default for SignalFilter {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}
