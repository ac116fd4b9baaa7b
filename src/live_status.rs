use crate::pipeline::{PipelineController, PipelineState};
use crate::types::SensorKind;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub state: PipelineState,
    pub accel_samples: u64,
    pub gyro_samples: u64,
    pub magn_samples: u64,
    pub heading_samples: u64,
    pub filtered_samples: u64,
    pub step_count: u64,
    // Dead-reckoned position, meters east/north of the start
    pub position_x: f64,
    pub position_y: f64,
    pub distance_m: f64,
    pub heading_deg: f64,
    pub uptime_seconds: u64,
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            state: PipelineState::Idle,
            accel_samples: 0,
            gyro_samples: 0,
            magn_samples: 0,
            heading_samples: 0,
            filtered_samples: 0,
            step_count: 0,
            position_x: 0.0,
            position_y: 0.0,
            distance_m: 0.0,
            heading_deg: 0.0,
            uptime_seconds: 0,
        }
    }

    pub fn from_pipeline(pipeline: &PipelineController) -> Self {
        let raw = pipeline.raw_log();
        let position = pipeline.current_position();
        let heading_deg = pipeline
            .headings()
            .last()
            .map(|h| h.azimuth.to_degrees())
            .unwrap_or(0.0);
        let uptime_seconds = pipeline
            .started_at()
            .map(|start| {
                let end = pipeline.stopped_at().unwrap_or_else(Utc::now);
                (end - start).num_seconds().max(0) as u64
            })
            .unwrap_or(0);

        Self {
            timestamp: current_timestamp(),
            state: pipeline.state(),
            accel_samples: raw.count(SensorKind::Accelerometer) as u64,
            gyro_samples: raw.count(SensorKind::Gyroscope) as u64,
            magn_samples: raw.count(SensorKind::Magnetometer) as u64,
            heading_samples: pipeline.headings().len() as u64,
            filtered_samples: pipeline.filtered_len() as u64,
            step_count: pipeline.step_count() as u64,
            position_x: position.x,
            position_y: position.y,
            distance_m: pipeline.distance(),
            heading_deg,
            uptime_seconds,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::types::TimedVector3;
    use approx::assert_relative_eq;

    #[test]
    fn test_status_from_idle_pipeline() {
        let pipeline = PipelineController::new(TrackerConfig::default()).unwrap();
        let status = LiveStatus::from_pipeline(&pipeline);
        assert_eq!(status.state, PipelineState::Idle);
        assert_eq!(status.accel_samples, 0);
        assert_eq!(status.uptime_seconds, 0);
    }

    #[test]
    fn test_status_reports_last_heading() {
        let mut pipeline = PipelineController::new(TrackerConfig::default()).unwrap();
        pipeline.start();
        pipeline.on_accelerometer(TimedVector3::new(0, 0.0, 0.0, 9.8)).unwrap();
        pipeline.on_magnetometer(TimedVector3::new(5, -22.0, 0.0, -40.0));

        let status = LiveStatus::from_pipeline(&pipeline);
        assert_eq!(status.accel_samples, 1);
        assert_eq!(status.magn_samples, 1);
        assert_eq!(status.heading_samples, 1);
        assert_relative_eq!(status.heading_deg, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live_status.json");
        LiveStatus::new().save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let parsed: LiveStatus = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.state, PipelineState::Idle);
        assert_eq!(parsed.step_count, 0);
    }
}
