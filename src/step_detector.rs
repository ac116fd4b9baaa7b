use crate::config::TrackerConfig;
use crate::types::{StepEvent, TimedScalar};
use log::{debug, trace};

/// Zig-zag peak finder over the filtered magnitude stream.
///
/// Owns the filtered history and a scan cursor that only moves forward.
/// A confirmed peak above the threshold becomes a step unless it falls
/// inside the minimum period of the previous step, in which case it either
/// replaces that step's peak (if at least as large) or is dropped.
pub struct StepDetector {
    filtered: Vec<TimedScalar>,
    scan_index: usize,
    steps: Vec<StepEvent>,
    peak_threshold: f64,
    min_period_ms: i64,
}

impl StepDetector {
    pub fn new(peak_threshold: f64, min_period_ms: i64) -> Self {
        StepDetector {
            filtered: Vec::new(),
            scan_index: 0,
            steps: Vec::new(),
            peak_threshold,
            min_period_ms,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.peak_threshold, config.step_min_period_ms)
    }

    pub fn push_filtered(&mut self, sample: TimedScalar) {
        self.filtered.push(sample);
    }

    /// Look for the next step after the scan cursor
    pub fn try_detect_step(&mut self) -> Option<StepEvent> {
        if self.filtered.len() < self.scan_index + 3 {
            return None;
        }
        let end = self.filtered.len() - 1;

        let mut current = self.scan_index;
        let mut value = self.filtered[current].value;
        let mut next = self.filtered[current + 1].value;

        while next <= value {
            value = next;
            current += 1;
            if current >= end {
                self.scan_index = current;
                return None;
            }
            next = self.filtered[current + 1].value;
        }

        // next > value here, so resuming at the valley skips the descent
        let valley = current;
        while next >= value {
            value = next;
            current += 1;
            if current >= end {
                // re-ascend from the valley once more samples arrive, so a
                // flat top is never consumed by the descent loop
                self.scan_index = valley;
                return None;
            }
            next = self.filtered[current + 1].value;
        }

        self.scan_index = current + 1;

        if value <= self.peak_threshold {
            return None;
        }

        let timestamp = self.filtered[current].timestamp;
        let min_period_ms = self.min_period_ms;

        if let Some(last) = self.steps.last_mut() {
            if timestamp - last.timestamp < min_period_ms {
                if value >= last.peak_value {
                    trace!(
                        "merging peak {:.3}@{} into step #{} ({:.3}@{})",
                        value,
                        timestamp,
                        last.sequence_index,
                        last.peak_value,
                        last.timestamp
                    );
                    last.timestamp = timestamp;
                    last.peak_value = value;
                } else {
                    trace!("dropping secondary peak {:.3}@{}", value, timestamp);
                }
                return None;
            }
        }

        let step = StepEvent {
            timestamp,
            peak_value: value,
            sequence_index: self.steps.len(),
        };
        self.steps.push(step);
        debug!(
            "step #{} at {} ms (peak {:.3})",
            step.sequence_index, step.timestamp, step.peak_value
        );
        Some(step)
    }

    pub fn steps(&self) -> &[StepEvent] {
        &self.steps
    }

    pub fn filtered(&self) -> &[TimedScalar] {
        &self.filtered
    }

    pub fn scan_index(&self) -> usize {
        self.scan_index
    }

    pub fn clear(&mut self) {
        self.filtered.clear();
        self.steps.clear();
        self.scan_index = 0;
    }
}

impl Default for StepDetector {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn feed(detector: &mut StepDetector, samples: &[(i64, f64)]) -> Vec<StepEvent> {
        let mut events = Vec::new();
        for &(ts, value) in samples {
            detector.push_filtered(TimedScalar::new(ts, value));
            if let Some(step) = detector.try_detect_step() {
                events.push(step);
            }
        }
        events
    }

    fn sinusoid(period_ms: f64, spacing_ms: i64, duration_ms: i64) -> Vec<(i64, f64)> {
        (0..duration_ms / spacing_ms)
            .map(|i| {
                let ts = i * spacing_ms;
                (ts, 10.0 + 2.0 * (2.0 * PI * ts as f64 / period_ms).sin())
            })
            .collect()
    }

    #[test]
    fn test_needs_three_samples() {
        let mut detector = StepDetector::default();
        detector.push_filtered(TimedScalar::new(0, 9.0));
        detector.push_filtered(TimedScalar::new(10, 12.0));
        assert!(detector.try_detect_step().is_none());
        assert_eq!(detector.scan_index(), 0);
    }

    #[test]
    fn test_clean_sinusoid_counts_ten_steps() {
        let mut detector = StepDetector::default();
        let events = feed(&mut detector, &sinusoid(500.0, 10, 5000));

        assert_eq!(events.len(), 10);
        for pair in events.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= 300);
        }
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.sequence_index, i);
            assert!(event.peak_value > 10.5);
        }
    }

    #[test]
    fn test_flat_top_arriving_one_sample_at_a_time() {
        let mut detector = StepDetector::default();
        let samples = [
            (0, 9.0),
            (10, 10.0),
            (20, 11.5),
            (30, 11.5),
            (40, 11.0),
            (50, 9.0),
        ];
        let events = feed(&mut detector, &samples);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].peak_value, 11.5);
        assert_eq!(events[0].timestamp, 30);
    }

    #[test]
    fn test_tied_sinusoid_top_still_detected() {
        // 120 ms and 130 ms sit symmetrically around the 125 ms crest
        let mut detector = StepDetector::default();
        let events = feed(&mut detector, &sinusoid(500.0, 10, 500));
        assert_eq!(events.len(), 1);
        assert!(events[0].timestamp == 120 || events[0].timestamp == 130);
    }

    #[test]
    fn test_low_peaks_rejected() {
        let mut detector = StepDetector::default();
        let samples: Vec<(i64, f64)> = sinusoid(500.0, 10, 3000)
            .into_iter()
            .map(|(ts, v)| (ts, 9.0 + (v - 10.0) * 0.5))
            .collect();
        assert!(feed(&mut detector, &samples).is_empty());
        assert!(detector.steps().is_empty());
    }

    #[test]
    fn test_larger_peak_inside_period_replaces_last_step() {
        let mut detector = StepDetector::default();
        let samples = [
            (0, 9.0),
            (50, 11.0),
            (100, 9.0),
            (150, 12.0),
            (200, 9.0),
            (250, 8.5),
        ];
        let events = feed(&mut detector, &samples);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 50);
        assert_eq!(detector.steps().len(), 1);
        assert_eq!(detector.steps()[0].timestamp, 150);
        assert_eq!(detector.steps()[0].peak_value, 12.0);
        assert_eq!(detector.steps()[0].sequence_index, 0);
    }

    #[test]
    fn test_smaller_peak_inside_period_discarded() {
        let mut detector = StepDetector::default();
        let samples = [
            (0, 9.0),
            (50, 12.0),
            (100, 9.0),
            (150, 11.0),
            (200, 9.0),
            (250, 8.5),
        ];
        let events = feed(&mut detector, &samples);

        assert_eq!(events.len(), 1);
        assert_eq!(detector.steps()[0].timestamp, 50);
        assert_eq!(detector.steps()[0].peak_value, 12.0);
    }

    #[test]
    fn test_merged_step_shifts_refractory_window() {
        let mut detector = StepDetector::default();
        // second peak merges at 150, third is 320 ms after the first but
        // only 170 ms after the merged peak
        let samples = [
            (0, 9.0),
            (0, 9.0),
            (0, 11.0),
            (100, 9.0),
            (150, 12.0),
            (200, 9.0),
            (320, 12.5),
            (400, 9.0),
            (800, 12.0),
            (900, 9.0),
            (950, 8.0),
        ];
        let events = feed(&mut detector, &samples);

        let emitted: Vec<i64> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(emitted, vec![0, 800]);
        assert_eq!(detector.steps()[0].timestamp, 320);
        assert_eq!(detector.steps()[0].peak_value, 12.5);
        assert_eq!(detector.steps()[1].sequence_index, 1);
    }

    #[test]
    fn test_emitted_steps_respect_min_period_under_noise() {
        let mut detector = StepDetector::default();
        let mut seed: u64 = 0x2545F4914F6CDD1D;
        let mut samples = Vec::new();
        for i in 0..2000i64 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let noise = ((seed >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            let ts = i * 10;
            let base = 10.0 + 2.0 * (2.0 * PI * ts as f64 / 430.0).sin();
            samples.push((ts, base + noise * 1.5));
        }

        let events = feed(&mut detector, &samples);
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= 300);
        }
    }

    #[test]
    fn test_scan_cursor_never_moves_backward() {
        let mut detector = StepDetector::default();
        let mut last_cursor = 0;
        for (ts, value) in sinusoid(620.0, 10, 4000) {
            detector.push_filtered(TimedScalar::new(ts, value));
            detector.try_detect_step();
            assert!(detector.scan_index() >= last_cursor);
            last_cursor = detector.scan_index();
        }
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut detector = StepDetector::default();
        feed(&mut detector, &sinusoid(500.0, 10, 2000));
        assert!(!detector.steps().is_empty());

        detector.clear();
        assert!(detector.steps().is_empty());
        assert!(detector.filtered().is_empty());
        assert_eq!(detector.scan_index(), 0);
    }
}
