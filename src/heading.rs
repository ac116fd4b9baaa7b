use crate::error::{TResult, TrackerError};
use crate::types::{HeadingSample, TimestampMs};

/// Heading lookup over the append-only orientation history.
///
/// Step timestamps arrive in order, so the cursor only moves forward and a
/// lookup never rescans samples already passed for an earlier step.
#[derive(Debug, Default, Clone)]
pub struct HeadingResolver {
    samples: Vec<HeadingSample>,
    time_index: usize,
}

impl HeadingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: HeadingSample) {
        self.samples.push(sample);
    }

    /// Azimuth at `step_timestamp`: the mean of the two samples straddling it,
    /// or the last sample when the history ends first.
    pub fn resolve_heading(&mut self, step_timestamp: TimestampMs) -> TResult<f64> {
        if self.samples.is_empty() {
            return Err(TrackerError::IllegalState(
                "heading requested before any orientation sample".to_string(),
            ));
        }

        let len = self.samples.len();
        let mut index = self.time_index;
        let mut azimuth = self.samples[index].azimuth;

        while index < len {
            if self.samples[index].timestamp > step_timestamp {
                let prev = index.saturating_sub(1);
                azimuth = (self.samples[index].azimuth + self.samples[prev].azimuth) / 2.0;
                break;
            }
            index += 1;
        }

        if index == len {
            index = len - 1;
            azimuth = self.samples[index].azimuth;
        }

        self.time_index = index;
        Ok(azimuth)
    }

    pub fn samples(&self) -> &[HeadingSample] {
        &self.samples
    }

    pub fn cursor(&self) -> usize {
        self.time_index
    }

    pub fn last(&self) -> Option<&HeadingSample> {
        self.samples.last()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.time_index = 0;
    }
}
