//! Sensor input: recorded-session files and the cross-thread sample queue.

use crate::error::{TResult, TrackerError};
use crate::session::TrackerSession;
use crate::storage::SessionExport;
use crate::types::{SensorKind, SensorSample, TimedVector3};
use crossbeam::channel::{self, Receiver, Sender};
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Parse one `timestamp, x, y, z` record. `line` is 1-based, for errors.
pub fn parse_record(text: &str, line: usize) -> TResult<TimedVector3> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(TrackerError::Parse {
            line,
            message: format!("expected 4 fields, found {}", fields.len()),
        });
    }

    let timestamp = fields[0].parse::<i64>().map_err(|e| TrackerError::Parse {
        line,
        message: format!("bad timestamp {:?}: {}", fields[0], e),
    })?;
    let mut axes = [0.0f64; 3];
    for (axis, field) in axes.iter_mut().zip(&fields[1..]) {
        *axis = field.parse::<f64>().map_err(|e| TrackerError::Parse {
            line,
            message: format!("bad value {:?}: {}", field, e),
        })?;
    }
    Ok(TimedVector3::new(timestamp, axes[0], axes[1], axes[2]))
}

/// Parse a whole record stream, skipping blank lines
pub fn parse_records<R: BufRead>(reader: R) -> TResult<Vec<TimedVector3>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_record(&line, idx + 1)?);
    }
    Ok(records)
}

/// Read a record file, transparently decompressing `.gz`
pub fn read_records(path: &Path) -> TResult<Vec<TimedVector3>> {
    let file = File::open(path).map_err(|e| {
        TrackerError::StorageError(format!("cannot open {}: {}", path.display(), e))
    })?;
    let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    parse_records(BufReader::new(reader)).map_err(|e| match e {
        TrackerError::Parse { line, message } => TrackerError::Parse {
            line,
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    })
}

/// Raw streams of one recorded session
#[derive(Debug, Clone, Default)]
pub struct RecordedSession {
    pub accelerometer: Vec<TimedVector3>,
    pub gyroscope: Vec<TimedVector3>,
    pub magnetometer: Vec<TimedVector3>,
}

impl RecordedSession {
    /// Load `<prefix>_acce.txt`, `_gyro.txt` and `_magn.txt` (optionally `.gz`).
    ///
    /// When a directory holds several saves, the newest prefix (last by name)
    /// that has an accelerometer file is used, and the gyroscope and
    /// magnetometer files are only taken from that same save. Those two
    /// default to empty when missing.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> TResult<Self> {
        let dir = dir.as_ref();
        let prefix = newest_save_prefix(dir)?.ok_or_else(|| {
            TrackerError::StorageError(format!("no accelerometer record in {}", dir.display()))
        })?;
        debug!("loading save {} from {}", prefix, dir.display());

        let mut session = RecordedSession::default();
        for kind in SensorKind::ALL {
            match record_path(dir, &prefix, kind) {
                Some(path) => {
                    let records = read_records(&path)?;
                    debug!("{}: {} records", path.display(), records.len());
                    *session.stream_mut(kind) = records;
                }
                None => warn!("no {} record for save {}", kind.id(), prefix),
            }
        }
        Ok(session)
    }

    pub fn from_export(export: &SessionExport) -> Self {
        RecordedSession {
            accelerometer: export.accelerometer.clone(),
            gyroscope: export.gyroscope.clone(),
            magnetometer: export.magnetometer.clone(),
        }
    }

    pub fn stream(&self, kind: SensorKind) -> &[TimedVector3] {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }

    fn stream_mut(&mut self, kind: SensorKind) -> &mut Vec<TimedVector3> {
        match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Gyroscope => &mut self.gyroscope,
            SensorKind::Magnetometer => &mut self.magnetometer,
        }
    }

    pub fn len(&self) -> usize {
        self.accelerometer.len() + self.gyroscope.len() + self.magnetometer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All samples in timestamp order; ties keep accel, gyro, magn order
    pub fn merged(&self) -> Vec<SensorSample> {
        let mut samples: Vec<SensorSample> = SensorKind::ALL
            .iter()
            .flat_map(|&kind| {
                self.stream(kind)
                    .iter()
                    .map(move |&data| SensorSample::new(kind, data))
            })
            .collect();
        // stable sort
        samples.sort_by_key(|s| s.data.timestamp);
        samples
    }
}

fn record_suffixes(kind: SensorKind) -> [String; 2] {
    [format!("_{}.txt", kind.id()), format!("_{}.txt.gz", kind.id())]
}

/// Newest save prefix that has an accelerometer record
fn newest_save_prefix(dir: &Path) -> TResult<Option<String>> {
    let suffixes = record_suffixes(SensorKind::Accelerometer);
    let mut prefixes: Vec<String> = fs::read_dir(dir)
        .map_err(|e| TrackerError::StorageError(format!("cannot read {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| {
            suffixes
                .iter()
                .find_map(|suffix| name.strip_suffix(suffix.as_str()).map(str::to_string))
        })
        .collect();
    prefixes.sort();
    Ok(prefixes.pop())
}

fn record_path(dir: &Path, prefix: &str, kind: SensorKind) -> Option<PathBuf> {
    record_suffixes(kind)
        .iter()
        .map(|suffix| dir.join(format!("{}{}", prefix, suffix)))
        .find(|path| path.is_file())
}

/// Totals reported by the queue worker when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub processed: u64,
    pub steps: u64,
    pub errors: u64,
}

/// Multi-producer queue feeding one worker thread that owns pipeline access.
///
/// Producers on any thread clone the sender; the worker drains samples into
/// the session in arrival order.
pub struct SampleQueue {
    sender: Option<Sender<SensorSample>>,
    worker: Option<thread::JoinHandle<QueueStats>>,
}

impl SampleQueue {
    pub fn spawn(session: Arc<TrackerSession>) -> Self {
        let (sender, receiver) = channel::unbounded();
        let worker = thread::spawn(move || drain(receiver, session));
        SampleQueue {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Extra producer handle; the worker runs until all of them are dropped
    pub fn sender(&self) -> Option<Sender<SensorSample>> {
        self.sender.clone()
    }

    pub fn send(&self, sample: SensorSample) -> TResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| TrackerError::Internal("sample queue closed".to_string()))?;
        sender
            .send(sample)
            .map_err(|_| TrackerError::Internal("sample queue worker exited".to_string()))
    }

    /// Close this producer and wait for the worker to finish draining
    pub fn close(mut self) -> TResult<QueueStats> {
        self.sender.take();
        let worker = self
            .worker
            .take()
            .ok_or_else(|| TrackerError::Internal("sample queue already closed".to_string()))?;
        worker
            .join()
            .map_err(|_| TrackerError::Internal("sample queue worker panicked".to_string()))
    }
}

fn drain(receiver: Receiver<SensorSample>, session: Arc<TrackerSession>) -> QueueStats {
    let mut stats = QueueStats::default();
    for sample in receiver.iter() {
        stats.processed += 1;
        match session.push_sample(sample) {
            Ok(Some(_)) => stats.steps += 1,
            Ok(None) => {}
            Err(e) => {
                stats.errors += 1;
                warn!("sample at {} rejected: {}", sample.data.timestamp, e);
            }
        }
    }
    info!(
        "sample queue drained: {} samples, {} steps, {} errors",
        stats.processed, stats.steps, stats.errors
    );
    stats
}
