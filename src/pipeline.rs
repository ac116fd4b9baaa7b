//! Step pipeline state machine.
//!
//! `PipelineController` owns every per-session history and drives
//! filter -> detector -> heading -> trajectory on each accelerometer sample.
//! It is single-owner and not internally synchronized; wrap it in
//! [`crate::session::TrackerSession`] when samples arrive on several threads.

use crate::config::TrackerConfig;
use crate::error::{TResult, TrackerError};
use crate::heading::HeadingResolver;
use crate::notifier::TrackListener;
use crate::orientation::OrientationEstimator;
use crate::smoothing::SignalFilter;
use crate::step_detector::StepDetector;
use crate::storage::SessionExport;
use crate::trajectory::{StepUpdate, TrajectoryBuilder};
use crate::types::{
    HeadingSample, PathPoint, SensorKind, SensorSample, StepEvent, TimedVector3,
};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Active,
}

/// Raw sample log for the three sensors, in arrival order
#[derive(Debug, Default, Clone)]
pub struct RawLog {
    accelerometer: Vec<TimedVector3>,
    gyroscope: Vec<TimedVector3>,
    magnetometer: Vec<TimedVector3>,
}

impl RawLog {
    pub fn push(&mut self, kind: SensorKind, sample: TimedVector3) {
        self.get_mut(kind).push(sample);
    }

    pub fn get(&self, kind: SensorKind) -> &[TimedVector3] {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }

    fn get_mut(&mut self, kind: SensorKind) -> &mut Vec<TimedVector3> {
        match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Gyroscope => &mut self.gyroscope,
            SensorKind::Magnetometer => &mut self.magnetometer,
        }
    }

    pub fn count(&self, kind: SensorKind) -> usize {
        self.get(kind).len()
    }

    pub fn clear(&mut self) {
        self.accelerometer.clear();
        self.gyroscope.clear();
        self.magnetometer.clear();
    }
}

pub struct PipelineController {
    config: TrackerConfig,
    state: PipelineState,
    raw: RawLog,
    filter: SignalFilter,
    detector: StepDetector,
    orientation: OrientationEstimator,
    headings: HeadingResolver,
    trajectory: TrajectoryBuilder,
    listener: Option<Arc<dyn TrackListener>>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl PipelineController {
    pub fn new(config: TrackerConfig) -> TResult<Self> {
        config.validate()?;
        Ok(PipelineController {
            filter: SignalFilter::from_config(&config),
            detector: StepDetector::from_config(&config),
            config,
            state: PipelineState::Idle,
            raw: RawLog::default(),
            orientation: OrientationEstimator::new(),
            headings: HeadingResolver::new(),
            trajectory: TrajectoryBuilder::new(),
            listener: None,
            started_at: None,
            stopped_at: None,
        })
    }

    pub fn with_listener(mut self, listener: Arc<dyn TrackListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn set_listener(&mut self, listener: Option<Arc<dyn TrackListener>>) {
        self.listener = listener;
    }

    /// Clear every history and begin accepting samples
    pub fn start(&mut self) {
        self.raw.clear();
        self.filter.clear();
        self.detector.clear();
        self.orientation.reset();
        self.headings.clear();
        self.trajectory.reset();
        self.state = PipelineState::Active;
        self.started_at = Some(Utc::now());
        self.stopped_at = None;
        info!("step pipeline started");
    }

    /// Freeze the histories; they stay readable until the next `start()`
    pub fn stop(&mut self) {
        if self.state == PipelineState::Active {
            self.state = PipelineState::Idle;
            self.stopped_at = Some(Utc::now());
            info!(
                "step pipeline stopped: {} steps, {} accel samples",
                self.trajectory.step_count(),
                self.raw.count(SensorKind::Accelerometer)
            );
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == PipelineState::Active
    }

    /// Dispatch a tagged sample. Samples are ignored while idle.
    pub fn on_sample(&mut self, sample: SensorSample) -> TResult<Option<StepUpdate>> {
        match sample.kind {
            SensorKind::Accelerometer => self.on_accelerometer(sample.data),
            SensorKind::Gyroscope => {
                self.on_gyroscope(sample.data);
                Ok(None)
            }
            SensorKind::Magnetometer => {
                self.on_magnetometer(sample.data);
                Ok(None)
            }
        }
    }

    /// Log, update orientation, filter and look for a step.
    ///
    /// Fails with `IllegalState` if a step is detected before any heading
    /// sample exists; the step itself stays recorded.
    pub fn on_accelerometer(&mut self, sample: TimedVector3) -> TResult<Option<StepUpdate>> {
        if !self.is_active() {
            return Ok(None);
        }

        self.raw.push(SensorKind::Accelerometer, sample);
        self.orientation.on_accelerometer(&sample);
        if self.orientation.has_magnetometer() {
            self.record_heading(sample.timestamp);
        }

        let filtered = match self
            .filter
            .add_accelerometer_sample(sample.timestamp, sample.x, sample.y, sample.z)
        {
            Some(filtered) => filtered,
            None => return Ok(None),
        };
        self.detector.push_filtered(filtered);

        let step = match self.detector.try_detect_step() {
            Some(step) => step,
            None => return Ok(None),
        };

        let update = self
            .trajectory
            .on_step(&step, self.config.step_length_m, &mut self.headings)?;
        debug!(
            "step #{} heading {:.1} deg -> ({:.2}, {:.2})",
            update.step_count,
            update.azimuth.to_degrees(),
            update.position.x,
            update.position.y
        );
        if let Some(listener) = &self.listener {
            listener.on_step_update(update.position.x, update.position.y, update.step_count);
        }
        Ok(Some(update))
    }

    pub fn on_magnetometer(&mut self, sample: TimedVector3) {
        if !self.is_active() {
            return;
        }
        self.raw.push(SensorKind::Magnetometer, sample);
        self.orientation.on_magnetometer(&sample);
        if self.orientation.has_accelerometer() {
            self.record_heading(sample.timestamp);
        }
    }

    /// Gyroscope samples are only logged
    pub fn on_gyroscope(&mut self, sample: TimedVector3) {
        if !self.is_active() {
            return;
        }
        self.raw.push(SensorKind::Gyroscope, sample);
    }

    fn record_heading(&mut self, timestamp: i64) {
        if let Some(heading) = self.orientation.compute_heading(timestamp) {
            self.headings.push(heading);
        }
    }

    pub fn current_position(&self) -> PathPoint {
        self.trajectory.current()
    }

    pub fn step_count(&self) -> usize {
        self.trajectory.step_count()
    }

    pub fn steps(&self) -> &[StepEvent] {
        self.detector.steps()
    }

    pub fn path(&self) -> &[PathPoint] {
        self.trajectory.path()
    }

    pub fn distance(&self) -> f64 {
        self.trajectory.distance()
    }

    pub fn headings(&self) -> &[HeadingSample] {
        self.headings.samples()
    }

    pub fn raw_log(&self) -> &RawLog {
        &self.raw
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    pub fn filtered_len(&self) -> usize {
        self.detector.filtered().len()
    }

    /// Snapshot of the stopped session for a storage collaborator
    pub fn export(&self) -> TResult<SessionExport> {
        if self.is_active() {
            return Err(TrackerError::IllegalState(
                "export requires a stopped session".to_string(),
            ));
        }
        Ok(SessionExport {
            started_at: self.started_at.map(|t| t.to_rfc3339()),
            stopped_at: self.stopped_at.map(|t| t.to_rfc3339()),
            step_length_m: self.config.step_length_m,
            accelerometer: self.raw.get(SensorKind::Accelerometer).to_vec(),
            gyroscope: self.raw.get(SensorKind::Gyroscope).to_vec(),
            magnetometer: self.raw.get(SensorKind::Magnetometer).to_vec(),
            filtered: self.detector.filtered().to_vec(),
            orientation: self.headings.samples().to_vec(),
            steps: self.detector.steps().to_vec(),
            path: self.trajectory.path().to_vec(),
        })
    }
}
