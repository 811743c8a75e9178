//! Per-frame gaze, blink and proximity classification.
//!
//! [`GazeClassifier`] is the only stateful piece: it owns the blink
//! hysteresis and the distance baseline. Everything else is a pure function
//! of one frame's landmarks.

mod blink;
mod direction;
mod proximity;

#[cfg(test)]
pub(crate) mod test_support;

pub use blink::{eye_aspect_ratio, BlinkState, BlinkTracker};
pub use direction::{
    classify_gaze, effective_threshold, iris_diameter, iris_positions, mean_relative_position,
    GazeDirection, IrisPositions,
};
pub use proximity::{face_width, ProximityBaseline, ProximityMonitor};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::landmarks::{FrameSize, LandmarkSet};
use crate::storage::{BlinkConfig, Config, GazeConfig, ProximityConfig};

/// Everything the rest of the system reads about one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeAnalysis {
    direction: GazeDirection,
    is_blinking: bool,
    too_close: bool,
    blink_rate: f64,
    iris_positions: Option<IrisPositions>,
    iris_diameter: Option<f64>,
    at: NaiveDateTime,
}

impl GazeAnalysis {
    /// Build an analysis, dropping non-finite measurements.
    pub fn new(
        direction: GazeDirection,
        is_blinking: bool,
        too_close: bool,
        blink_rate: f64,
        iris_positions: Option<IrisPositions>,
        iris_diameter: Option<f64>,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            direction,
            is_blinking,
            too_close,
            blink_rate: if blink_rate.is_finite() && blink_rate > 0.0 {
                blink_rate
            } else {
                0.0
            },
            iris_positions,
            iris_diameter: iris_diameter.filter(|d| d.is_finite() && *d > 0.0),
            at,
        }
    }

    pub fn direction(&self) -> GazeDirection {
        self.direction
    }

    pub fn is_blinking(&self) -> bool {
        self.is_blinking
    }

    pub fn too_close(&self) -> bool {
        self.too_close
    }

    pub fn blink_rate(&self) -> f64 {
        self.blink_rate
    }

    pub fn iris_positions(&self) -> Option<IrisPositions> {
        self.iris_positions
    }

    pub fn iris_diameter(&self) -> Option<f64> {
        self.iris_diameter
    }

    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    pub fn is_looking_at_screen(&self) -> bool {
        self.direction.is_center()
    }
}

/// Gaze classifier with blink and distance calibration state.
#[derive(Debug, Clone)]
pub struct GazeClassifier {
    gaze: GazeConfig,
    blink: BlinkTracker,
    proximity: ProximityMonitor,
}

impl GazeClassifier {
    pub fn new(gaze: GazeConfig, blink: BlinkConfig, proximity: ProximityConfig) -> Self {
        Self {
            gaze,
            blink: BlinkTracker::new(blink),
            proximity: ProximityMonitor::new(proximity),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.gaze.clone(),
            config.blink.clone(),
            config.proximity.clone(),
        )
    }

    pub fn classify_gaze(&self, landmarks: Option<&LandmarkSet>, size: FrameSize) -> GazeDirection {
        classify_gaze(landmarks, size, &self.gaze)
    }

    pub fn detect_blink(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        size: FrameSize,
        now: NaiveDateTime,
    ) -> bool {
        self.blink.detect(landmarks, size, now)
    }

    pub fn blink_rate(&self, now: NaiveDateTime) -> f64 {
        self.blink.blink_rate(now)
    }

    pub fn blink_count(&self) -> u32 {
        self.blink.count()
    }

    pub fn is_too_close(&mut self, landmarks: Option<&LandmarkSet>, size: FrameSize) -> bool {
        self.proximity.is_too_close(landmarks, size)
    }

    pub fn reset_blink_counter(&mut self) {
        self.blink.reset();
    }

    pub fn reset_distance_calibration(&mut self) {
        self.proximity.reset();
    }

    pub fn blink_tracker(&self) -> &BlinkTracker {
        &self.blink
    }

    pub fn proximity(&self) -> &ProximityMonitor {
        &self.proximity
    }

    /// Run every classifier on one frame and bundle the result.
    pub fn analyze(
        &mut self,
        landmarks: &LandmarkSet,
        size: FrameSize,
        now: NaiveDateTime,
    ) -> GazeAnalysis {
        let direction = self.classify_gaze(Some(landmarks), size);
        let is_blinking = self.detect_blink(Some(landmarks), size, now);
        let too_close = self.is_too_close(Some(landmarks), size);

        tracing::trace!(%direction, is_blinking, too_close, "frame classified");

        GazeAnalysis::new(
            direction,
            is_blinking,
            too_close,
            self.blink_rate(now),
            iris_positions(landmarks, size),
            iris_diameter(landmarks, size),
            now,
        )
    }
}

impl Default for GazeClassifier {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
