//! "Too close to the screen" detection.
//!
//! The horizontal distance between the two outer eye corners is used as a
//! face-width proxy. The first `warmup_samples` widths are buffered and their
//! median becomes the baseline; after that a width more than
//! `too_close_ratio` times the baseline means the user leaned in.

use serde::{Deserialize, Serialize};

use crate::landmarks::{index, FrameSize, LandmarkSet};
use crate::storage::ProximityConfig;

/// Face-width proxy in pixels.
pub fn face_width(landmarks: &LandmarkSet, size: FrameSize) -> Option<f64> {
    let (left_x, _) = landmarks.pixel(index::LEFT_EYE_OUTER, size)?;
    let (right_x, _) = landmarks.pixel(index::RIGHT_EYE_OUTER, size)?;
    let width = (right_x - left_x).abs();
    (width > 0.0).then_some(width)
}

/// Warm-up buffer and the baseline derived from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProximityBaseline {
    samples: Vec<f64>,
    baseline: Option<f64>,
}

impl ProximityBaseline {
    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn samples_collected(&self) -> usize {
        self.samples.len()
    }
}

#[derive(Debug, Clone)]
pub struct ProximityMonitor {
    config: ProximityConfig,
    calibration: ProximityBaseline,
}

impl ProximityMonitor {
    pub fn new(config: ProximityConfig) -> Self {
        Self {
            config,
            calibration: ProximityBaseline::default(),
        }
    }

    pub fn calibration(&self) -> &ProximityBaseline {
        &self.calibration
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.baseline.is_some()
    }

    /// (collected, required) warm-up samples.
    pub fn warmup_progress(&self) -> (usize, usize) {
        (self.calibration.samples.len(), self.config.warmup_samples)
    }

    /// Whether the face in this frame is closer than the baseline allows.
    pub fn is_too_close(&mut self, landmarks: Option<&LandmarkSet>, size: FrameSize) -> bool {
        match landmarks.and_then(|l| face_width(l, size)) {
            Some(width) => self.observe_width(width),
            None => false,
        }
    }

    /// Feed one face width. Always false until the baseline is set.
    pub fn observe_width(&mut self, width: f64) -> bool {
        if !width.is_finite() || width <= 0.0 {
            return false;
        }

        let Some(baseline) = self.calibration.baseline else {
            self.calibration.samples.push(width);
            if self.calibration.samples.len() >= self.config.warmup_samples {
                let mut sorted = self.calibration.samples.clone();
                sorted.sort_by(f64::total_cmp);
                let median = sorted[sorted.len() / 2];
                self.calibration.baseline = Some(median);
                tracing::info!(baseline = median, "distance baseline set");
            }
            return false;
        };

        width / baseline > self.config.too_close_ratio
    }

    /// Drop the baseline and start a new warm-up.
    pub fn reset(&mut self) {
        self.calibration = ProximityBaseline::default();
        tracing::info!("distance calibration reset");
    }
}
