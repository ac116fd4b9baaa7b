use crate::config::SaveSelection;
use crate::error::{TResult, TrackerError};
use crate::types::{HeadingSample, PathPoint, SensorKind, StepEvent, TimedScalar, TimedVector3};
use chrono::{DateTime, Local};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete snapshot of a stopped session (JSON-serializable)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionExport {
    pub started_at: Option<String>,
    pub stopped_at: Option<String>,
    pub step_length_m: f64,
    pub accelerometer: Vec<TimedVector3>,
    pub gyroscope: Vec<TimedVector3>,
    pub magnetometer: Vec<TimedVector3>,
    pub filtered: Vec<TimedScalar>,
    pub orientation: Vec<HeadingSample>,
    pub steps: Vec<StepEvent>,
    pub path: Vec<PathPoint>,
}

impl SessionExport {
    pub fn raw(&self, kind: SensorKind) -> &[TimedVector3] {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }

    /// `timestamp, x, y, z` lines for one sensor, in append order
    pub fn raw_text(&self, kind: SensorKind) -> String {
        self.raw(kind).iter().map(TimedVector3::to_record).collect()
    }

    /// `timestamp, value` lines of the filtered magnitude stream
    pub fn filtered_text(&self) -> String {
        self.filtered.iter().map(TimedScalar::to_record).collect()
    }

    /// `timestamp, azimuth` lines of the orientation stream
    pub fn orientation_text(&self) -> String {
        self.orientation.iter().map(HeadingSample::to_record).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_export(self)
    }
}

/// Everything a saved session can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artifact {
    Wifi,
    Sensor(SensorKind),
    Filtered,
    Orientation,
}

impl Artifact {
    pub fn id(&self) -> &'static str {
        match self {
            Artifact::Wifi => "wifi",
            Artifact::Sensor(kind) => kind.id(),
            Artifact::Filtered => "debug_filtered",
            Artifact::Orientation => "debug_orientation",
        }
    }
}

/// Storage collaborator that persists rendered artifacts
pub trait ArtifactSink {
    fn write_artifact(&mut self, artifact: Artifact, contents: &str) -> TResult<()>;
}

/// Writes `<yyyyMMddHHmmss>_<id>.txt` files into one directory.
///
/// The timestamp prefix is captured once so every artifact of a save shares it.
pub struct DirectorySink {
    dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> TResult<Self> {
        Self::with_time(dir, Local::now())
    }

    pub fn with_time<P: AsRef<Path>>(dir: P, time: DateTime<Local>) -> TResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            TrackerError::StorageError(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(DirectorySink {
            dir,
            prefix: time.format("%Y%m%d%H%M%S").to_string(),
            written: Vec::new(),
        })
    }

    pub fn path_for(&self, artifact: Artifact) -> PathBuf {
        self.dir
            .join(format!("{}_{}.txt", self.prefix, artifact.id()))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ArtifactSink for DirectorySink {
    fn write_artifact(&mut self, artifact: Artifact, contents: &str) -> TResult<()> {
        let path = self.path_for(artifact);
        fs::write(&path, contents).map_err(|e| {
            TrackerError::StorageError(format!("cannot write {}: {}", path.display(), e))
        })?;
        self.written.push(path);
        Ok(())
    }
}

/// Save the selected capture artifacts in order wifi, acce, gyro, magn.
///
/// The first failure aborts the remaining writes and is returned. The export
/// itself is untouched, so a failed save can simply be retried.
pub fn save_session<S: ArtifactSink>(
    export: &SessionExport,
    wifi: Option<&str>,
    sink: &mut S,
    selection: &SaveSelection,
) -> TResult<usize> {
    let mut written = 0;

    if selection.wifi {
        sink.write_artifact(Artifact::Wifi, wifi.unwrap_or(""))
            .map_err(|e| {
                warn!("failed to save wifi scan results: {}", e);
                e
            })?;
        written += 1;
    }

    let sensors = [
        (SensorKind::Accelerometer, selection.accelerometer),
        (SensorKind::Gyroscope, selection.gyroscope),
        (SensorKind::Magnetometer, selection.magnetometer),
    ];
    for (kind, enabled) in sensors {
        if !enabled {
            continue;
        }
        sink.write_artifact(Artifact::Sensor(kind), &export.raw_text(kind))
            .map_err(|e| {
                warn!("failed to save {} samples: {}", kind.id(), e);
                e
            })?;
        written += 1;
    }

    info!("saved {} session artifacts", written);
    Ok(written)
}

/// Save the filtered and orientation debug streams, skipping empty ones.
///
/// Both writes are attempted; the first error is reported afterwards.
pub fn save_debug_streams<S: ArtifactSink>(export: &SessionExport, sink: &mut S) -> TResult<usize> {
    let mut written = 0;
    let mut first_error = None;

    let streams = [
        (Artifact::Filtered, export.filtered.is_empty(), export.filtered_text()),
        (Artifact::Orientation, export.orientation.is_empty(), export.orientation_text()),
    ];
    for (artifact, empty, text) in streams {
        if empty {
            continue;
        }
        match sink.write_artifact(artifact, &text) {
            Ok(()) => written += 1,
            Err(e) => {
                warn!("failed to save {}: {}", artifact.id(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

/// Session statistics for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub duration_seconds: f64,
    pub accel_sample_count: usize,
    pub gyro_sample_count: usize,
    pub magn_sample_count: usize,
    pub heading_sample_count: usize,
    pub step_count: usize,
    pub distance_meters: f64,
    pub final_position: PathPoint,
}

impl SessionSummary {
    pub fn from_export(export: &SessionExport) -> Self {
        let first = export.accelerometer.first().map(|s| s.timestamp);
        let last = export.accelerometer.last().map(|s| s.timestamp);
        let duration_seconds = match (first, last) {
            (Some(a), Some(b)) => (b - a) as f64 / 1000.0,
            _ => 0.0,
        };
        let distance_meters = export
            .path
            .windows(2)
            .map(|w| (w[1].x - w[0].x).hypot(w[1].y - w[0].y))
            .sum();

        SessionSummary {
            duration_seconds,
            accel_sample_count: export.accelerometer.len(),
            gyro_sample_count: export.gyroscope.len(),
            magn_sample_count: export.magnetometer.len(),
            heading_sample_count: export.orientation.len(),
            step_count: export.path.len().saturating_sub(1),
            distance_meters,
            final_position: export.path.last().copied().unwrap_or_default(),
        }
    }
}
