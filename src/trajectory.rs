use crate::error::TResult;
use crate::heading::HeadingResolver;
use crate::types::{PathPoint, StepEvent};
use serde::{Deserialize, Serialize};

/// Position update produced for every accepted step
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepUpdate {
    pub step: StepEvent,
    pub azimuth: f64,
    pub position: PathPoint,
    pub step_count: usize,
}

/// Dead-reckoned walking path. x is east, y is north, both in meters.
#[derive(Debug, Clone)]
pub struct TrajectoryBuilder {
    path: Vec<PathPoint>,
}

impl TrajectoryBuilder {
    pub fn new() -> Self {
        TrajectoryBuilder {
            path: vec![PathPoint::ORIGIN],
        }
    }

    /// Project one step along the heading resolved at its timestamp
    pub fn on_step(
        &mut self,
        step: &StepEvent,
        step_length: f64,
        headings: &mut HeadingResolver,
    ) -> TResult<StepUpdate> {
        let azimuth = headings.resolve_heading(step.timestamp)?;
        let position = self.advance(azimuth, step_length);
        Ok(StepUpdate {
            step: *step,
            azimuth,
            position,
            step_count: self.step_count(),
        })
    }

    /// Append `previous + L * (sin az, cos az)` and return it
    pub fn advance(&mut self, azimuth: f64, step_length: f64) -> PathPoint {
        let previous = self.current();
        let next = PathPoint::new(
            previous.x + step_length * azimuth.sin(),
            previous.y + step_length * azimuth.cos(),
        );
        self.path.push(next);
        next
    }

    pub fn current(&self) -> PathPoint {
        self.path.last().copied().unwrap_or(PathPoint::ORIGIN)
    }

    pub fn step_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn path(&self) -> &[PathPoint] {
        &self.path
    }

    /// Straight-line length walked so far
    pub fn distance(&self) -> f64 {
        self.path
            .windows(2)
            .map(|w| (w[1].x - w[0].x).hypot(w[1].y - w[0].y))
            .sum()
    }

    pub fn reset(&mut self) {
        self.path.clear();
        self.path.push(PathPoint::ORIGIN);
    }
}

impl Default for TrajectoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
