//! Azimuth from the latest accelerometer and magnetometer vectors.
//!
//! The rotation matrix is built the usual way for a handheld device: the
//! east axis is `geomagnetic × gravity`, north is `gravity × east`, and the
//! azimuth is the angle of the device's y axis from magnetic north.

use crate::types::{HeadingSample, TimedVector3, TimestampMs};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

const EARTH_GRAVITY: f64 = 9.81;
/// Below this squared gravity norm the device is considered in free fall
const FREE_FALL_GRAVITY_SQUARED: f64 = 0.01 * EARTH_GRAVITY * EARTH_GRAVITY;
/// Minimum norm of `geomagnetic × gravity` for a usable east axis
const MIN_EAST_NORM: f64 = 0.1;

/// Euler angles extracted from the rotation matrix (radians)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub azimuth: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Rotation matrix whose rows are east, north and up in device coordinates.
/// Returns `None` in free fall or when the two vectors are near collinear.
pub fn rotation_matrix(gravity: &Vector3<f64>, geomagnetic: &Vector3<f64>) -> Option<Matrix3<f64>> {
    if gravity.norm_squared() < FREE_FALL_GRAVITY_SQUARED {
        return None;
    }

    let east = geomagnetic.cross(gravity);
    let east_norm = east.norm();
    if east_norm < MIN_EAST_NORM {
        return None;
    }

    let east = east / east_norm;
    let up = gravity.normalize();
    let north = up.cross(&east);

    Some(Matrix3::new(
        east.x, east.y, east.z,
        north.x, north.y, north.z,
        up.x, up.y, up.z,
    ))
}

pub fn orientation_from_matrix(r: &Matrix3<f64>) -> Orientation {
    Orientation {
        azimuth: r[(0, 1)].atan2(r[(1, 1)]),
        pitch: (-r[(2, 1)]).clamp(-1.0, 1.0).asin(),
        roll: (-r[(2, 0)]).atan2(r[(2, 2)]),
    }
}

/// Caches the last accelerometer and magnetometer vectors
#[derive(Debug, Default, Clone)]
pub struct OrientationEstimator {
    last_accel: Option<Vector3<f64>>,
    last_magn: Option<Vector3<f64>>,
}

impl OrientationEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_accelerometer(&mut self, sample: &TimedVector3) {
        self.last_accel = Some(Vector3::new(sample.x, sample.y, sample.z));
    }

    pub fn on_magnetometer(&mut self, sample: &TimedVector3) {
        self.last_magn = Some(Vector3::new(sample.x, sample.y, sample.z));
    }

    pub fn has_accelerometer(&self) -> bool {
        self.last_accel.is_some()
    }

    pub fn has_magnetometer(&self) -> bool {
        self.last_magn.is_some()
    }

    /// Full orientation from the cached pair, if both exist and are usable
    pub fn orientation(&self) -> Option<Orientation> {
        let gravity = self.last_accel.as_ref()?;
        let geomagnetic = self.last_magn.as_ref()?;
        rotation_matrix(gravity, geomagnetic).map(|r| orientation_from_matrix(&r))
    }

    pub fn compute_heading(&self, timestamp: TimestampMs) -> Option<HeadingSample> {
        self.orientation()
            .map(|o| HeadingSample::new(timestamp, o.azimuth))
    }

    pub fn reset(&mut self) {
        self.last_accel = None;
        self.last_magn = None;
    }
}
