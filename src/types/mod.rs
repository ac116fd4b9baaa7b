use serde::{Deserialize, Serialize};

/// Timestamps are milliseconds, non-decreasing within one sensor stream.
pub type TimestampMs = i64;

/// Scalar sample: filtered magnitude, orientation debug value or peak record
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedScalar {
    pub timestamp: TimestampMs,
    pub value: f64,
}

impl TimedScalar {
    pub fn new(timestamp: TimestampMs, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// One `timestamp, value` line of the debug export format
    pub fn to_record(&self) -> String {
        format!("{}, {:?}\n", self.timestamp, self.value)
    }
}

/// Raw accelerometer, gyroscope or magnetometer sample
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedVector3 {
    pub timestamp: TimestampMs,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TimedVector3 {
    pub fn new(timestamp: TimestampMs, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// One `timestamp, x, y, z` line of the raw export format.
    ///
    /// Values are written in Debug form so whole numbers keep their `.0`
    /// and every value parses back exactly.
    pub fn to_record(&self) -> String {
        format!("{}, {:?}, {:?}, {:?}\n", self.timestamp, self.x, self.y, self.z)
    }
}

/// Azimuth in radians from magnetic north
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadingSample {
    pub timestamp: TimestampMs,
    pub azimuth: f64,
}

impl HeadingSample {
    pub fn new(timestamp: TimestampMs, azimuth: f64) -> Self {
        Self { timestamp, azimuth }
    }

    pub fn to_record(&self) -> String {
        TimedScalar::new(self.timestamp, self.azimuth).to_record()
    }
}

/// One accepted footfall
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub timestamp: TimestampMs,
    pub peak_value: f64,
    pub sequence_index: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

impl PathPoint {
    pub const ORIGIN: PathPoint = PathPoint { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The closed set of sensors the pipeline consumes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::Magnetometer,
    ];

    /// Short id used in artifact file names
    pub fn id(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "acce",
            SensorKind::Gyroscope => "gyro",
            SensorKind::Magnetometer => "magn",
        }
    }
}

/// A sample tagged with the sensor that produced it
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub kind: SensorKind,
    pub data: TimedVector3,
}

impl SensorSample {
    pub fn new(kind: SensorKind, data: TimedVector3) -> Self {
        Self { kind, data }
    }

    pub fn accelerometer(timestamp: TimestampMs, x: f64, y: f64, z: f64) -> Self {
        Self::new(SensorKind::Accelerometer, TimedVector3::new(timestamp, x, y, z))
    }

    pub fn gyroscope(timestamp: TimestampMs, x: f64, y: f64, z: f64) -> Self {
        Self::new(SensorKind::Gyroscope, TimedVector3::new(timestamp, x, y, z))
    }

    pub fn magnetometer(timestamp: TimestampMs, x: f64, y: f64, z: f64) -> Self {
        Self::new(SensorKind::Magnetometer, TimedVector3::new(timestamp, x, y, z))
    }
}
