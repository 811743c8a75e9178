//! Screen-bounds calibration.
//!
//! The user looks at the left, right, top and bottom edges and the centre of
//! the screen while iris samples are collected. The averaged positions, with
//! a 10% margin, become the [`ScreenBounds`]. The gaze classifier does not
//! depend on this; it is kept for tools that want an absolute on-screen test.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, ValidationError};
use crate::gaze::iris_positions;
use crate::landmarks::{FrameSize, LandmarkSet};
use crate::storage::{load_json, LoadOutcome};

/// Samples the interactive flow collects for each position.
pub const SAMPLES_PER_POSITION: usize = 15;

/// Margin added on each side, as a fraction of the calibrated range.
const MARGIN_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationPosition {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl CalibrationPosition {
    /// Collection order.
    pub const ALL: [CalibrationPosition; 5] = [
        CalibrationPosition::Left,
        CalibrationPosition::Right,
        CalibrationPosition::Top,
        CalibrationPosition::Bottom,
        CalibrationPosition::Center,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CalibrationPosition::Left => "left",
            CalibrationPosition::Right => "right",
            CalibrationPosition::Top => "top",
            CalibrationPosition::Bottom => "bottom",
            CalibrationPosition::Center => "center",
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            CalibrationPosition::Left => "Look at the LEFT EDGE of your screen",
            CalibrationPosition::Right => "Look at the RIGHT EDGE of your screen",
            CalibrationPosition::Top => "Look at the TOP EDGE of your screen",
            CalibrationPosition::Bottom => "Look at the BOTTOM EDGE of your screen",
            CalibrationPosition::Center => "Look at the CENTER of your screen",
        }
    }
}

impl fmt::Display for CalibrationPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalibrationPosition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(CalibrationPosition::Left),
            "right" => Ok(CalibrationPosition::Right),
            "top" => Ok(CalibrationPosition::Top),
            "bottom" => Ok(CalibrationPosition::Bottom),
            "center" | "centre" => Ok(CalibrationPosition::Center),
            other => Err(ValidationError::InvalidValue {
                field: "position".into(),
                message: format!("unknown calibration position '{other}'"),
            }),
        }
    }
}

/// One averaged iris sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub position: CalibrationPosition,
    pub iris_x: f64,
    pub iris_y: f64,
    /// Local time. Older files store float seconds since the Unix epoch.
    #[serde(deserialize_with = "local_or_epoch")]
    pub timestamp: NaiveDateTime,
}

fn local_or_epoch<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Epoch(f64),
        Local(NaiveDateTime),
    }

    match Timestamp::deserialize(deserializer)? {
        Timestamp::Local(at) => Ok(at),
        Timestamp::Epoch(secs) => {
            if !secs.is_finite() {
                return Err(D::Error::custom("timestamp is not finite"));
            }
            let whole = secs.floor();
            let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
            DateTime::from_timestamp(whole as i64, nanos)
                .map(|utc| utc.with_timezone(&Local).naive_local())
                .ok_or_else(|| D::Error::custom(format!("timestamp {secs} out of range")))
        }
    }
}

/// Iris-space rectangle that counts as "on screen".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl ScreenBounds {
    /// Whether an iris position falls inside the bounds.
    ///
    /// Works whichever way round the edges were calibrated (a mirrored camera
    /// swaps left and right).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (x_min, x_max) = ordered(self.left, self.right);
        let (y_min, y_max) = ordered(self.top, self.bottom);
        x >= x_min && x <= x_max && y >= y_min && y <= y_max
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenCalibration {
    #[serde(default)]
    pub screen_bounds: Option<ScreenBounds>,
    #[serde(default)]
    pub calibration_points: Vec<CalibrationPoint>,
    #[serde(default)]
    pub is_calibrated: bool,
}

impl ScreenCalibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the mean iris position for `position`.
    ///
    /// Returns false when the frame has no usable iris landmarks.
    pub fn collect_sample(
        &mut self,
        landmarks: &LandmarkSet,
        size: FrameSize,
        position: CalibrationPosition,
        now: NaiveDateTime,
    ) -> bool {
        let Some(iris) = iris_positions(landmarks, size) else {
            return false;
        };
        let (iris_x, iris_y) = iris.mean();
        self.calibration_points.push(CalibrationPoint {
            position,
            iris_x,
            iris_y,
            timestamp: now,
        });
        tracing::debug!(%position, iris_x, iris_y, "calibration sample collected");
        true
    }

    pub fn samples_for(&self, position: CalibrationPosition) -> usize {
        self.calibration_points
            .iter()
            .filter(|p| p.position == position)
            .count()
    }

    /// Positions that have no samples yet, in collection order.
    pub fn missing_positions(&self) -> Vec<CalibrationPosition> {
        CalibrationPosition::ALL
            .into_iter()
            .filter(|p| self.samples_for(*p) == 0)
            .collect()
    }

    /// Derive the screen bounds from the collected samples.
    ///
    /// # Errors
    ///
    /// Fails if any of the five positions has no samples.
    pub fn finalize(&mut self) -> Result<ScreenBounds, ValidationError> {
        let missing = self.missing_positions();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|p| p.as_str()).collect();
            return Err(ValidationError::IncompleteCalibration(names.join(", ")));
        }

        let left = self.mean_of(CalibrationPosition::Left).0;
        let right = self.mean_of(CalibrationPosition::Right).0;
        let top = self.mean_of(CalibrationPosition::Top).1;
        let bottom = self.mean_of(CalibrationPosition::Bottom).1;
        let (center_x, center_y) = self.mean_of(CalibrationPosition::Center);

        let x_margin = (right - left) * MARGIN_RATIO;
        let y_margin = (bottom - top) * MARGIN_RATIO;

        let bounds = ScreenBounds {
            left: left - x_margin,
            right: right + x_margin,
            top: top - y_margin,
            bottom: bottom + y_margin,
            center_x,
            center_y,
        };
        self.screen_bounds = Some(bounds);
        self.is_calibrated = true;
        tracing::info!(
            "screen calibrated: x {:.1}..{:.1}, y {:.1}..{:.1}",
            bounds.left,
            bounds.right,
            bounds.top,
            bounds.bottom
        );
        Ok(bounds)
    }

    fn mean_of(&self, position: CalibrationPosition) -> (f64, f64) {
        let (sum_x, sum_y, n) = self
            .calibration_points
            .iter()
            .filter(|p| p.position == position)
            .fold((0.0, 0.0, 0usize), |(x, y, n), p| {
                (x + p.iris_x, y + p.iris_y, n + 1)
            });
        let n = n.max(1) as f64;
        (sum_x / n, sum_y / n)
    }

    /// Load a saved calibration. A missing or unreadable file yields an
    /// uncalibrated value.
    pub fn load(path: &Path) -> (Self, LoadOutcome) {
        let (calibration, outcome) = load_json::<ScreenCalibration>(path);
        outcome.log("screen calibration", path);
        let mut calibration = calibration.unwrap_or_default();
        if calibration.is_calibrated && calibration.screen_bounds.is_none() {
            calibration.is_calibrated = false;
        }
        (calibration, outcome)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
