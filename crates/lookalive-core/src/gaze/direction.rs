//! Gaze direction from iris position within the eye socket.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::landmarks::{index, FrameSize, LandmarkSet};
use crate::storage::GazeConfig;

/// Corner spans narrower than this (in pixels) are treated as collapsed.
const MIN_EYE_SPAN_PX: f64 = 1e-6;

/// Fraction of the eye corner span an iris typically covers.
const IRIS_TO_EYE_RATIO: f64 = 0.25;

/// Where the user is looking relative to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeDirection {
    Left,
    Right,
    Center,
    /// No face, or no iris landmarks.
    Away,
}

impl GazeDirection {
    pub fn is_center(self) -> bool {
        self == GazeDirection::Center
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GazeDirection::Left => "left",
            GazeDirection::Right => "right",
            GazeDirection::Center => "center",
            GazeDirection::Away => "away",
        }
    }
}

impl fmt::Display for GazeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel positions of both iris centres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrisPositions {
    pub left: (f64, f64),
    pub right: (f64, f64),
}

impl IrisPositions {
    /// Midpoint of the two iris centres.
    pub fn mean(&self) -> (f64, f64) {
        (
            (self.left.0 + self.right.0) / 2.0,
            (self.left.1 + self.right.1) / 2.0,
        )
    }

    fn is_finite(&self) -> bool {
        [self.left.0, self.left.1, self.right.0, self.right.1]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Both iris centres in pixels, or `None` if either is missing.
pub fn iris_positions(landmarks: &LandmarkSet, size: FrameSize) -> Option<IrisPositions> {
    let positions = IrisPositions {
        left: landmarks.pixel(index::LEFT_IRIS_CENTER, size)?,
        right: landmarks.pixel(index::RIGHT_IRIS_CENTER, size)?,
    };
    positions.is_finite().then_some(positions)
}

/// Rough iris diameter in pixels, estimated from the left eye span.
pub fn iris_diameter(landmarks: &LandmarkSet, size: FrameSize) -> Option<f64> {
    iris_positions(landmarks, size)?;
    let span = eye_span(landmarks, size, index::LEFT_EYE_INNER, index::LEFT_EYE_OUTER)?;
    Some(span * IRIS_TO_EYE_RATIO)
}

fn eye_span(landmarks: &LandmarkSet, size: FrameSize, inner: usize, outer: usize) -> Option<f64> {
    let (inner_x, _) = landmarks.pixel(inner, size)?;
    let (outer_x, _) = landmarks.pixel(outer, size)?;
    Some((outer_x - inner_x).abs())
}

/// Horizontal iris offset from the inner corner, as a fraction of the eye span.
///
/// Returns `None` when the corners are missing or the span has collapsed.
fn relative_position(
    landmarks: &LandmarkSet,
    size: FrameSize,
    iris_x: f64,
    inner: usize,
    outer: usize,
) -> Option<f64> {
    let span = eye_span(landmarks, size, inner, outer)?;
    if span < MIN_EYE_SPAN_PX {
        return None;
    }
    let (inner_x, _) = landmarks.pixel(inner, size)?;
    Some((iris_x - inner_x) / span)
}

/// Mean relative iris position across both eyes.
pub fn mean_relative_position(
    landmarks: &LandmarkSet,
    size: FrameSize,
    iris: &IrisPositions,
) -> Option<f64> {
    let left = relative_position(
        landmarks,
        size,
        iris.left.0,
        index::LEFT_EYE_INNER,
        index::LEFT_EYE_OUTER,
    )?;
    let right = relative_position(
        landmarks,
        size,
        iris.right.0,
        index::RIGHT_EYE_INNER,
        index::RIGHT_EYE_OUTER,
    )?;
    Some((left + right) / 2.0)
}

/// Threshold around 0.5 for the given mean iris x.
///
/// The further the irises sit from the frame's horizontal centre, the lower
/// the threshold, so off-centre looks are picked up more readily.
pub fn effective_threshold(mean_iris_x: f64, frame_width: f64, config: &GazeConfig) -> f64 {
    let half = frame_width / 2.0;
    let deviation = if half > 0.0 {
        (mean_iris_x - half).abs() / half
    } else {
        0.0
    };

    let threshold = if deviation > config.off_center_cutoff {
        config.base_threshold - config.threshold_adjustment
    } else {
        config.base_threshold + config.threshold_adjustment
    };
    threshold.max(0.0)
}

/// Classify where the user is looking.
///
/// `None` (no face), an empty frame or missing iris landmarks yield
/// [`GazeDirection::Away`]. Missing or collapsed eye corners yield
/// [`GazeDirection::Center`].
pub fn classify_gaze(
    landmarks: Option<&LandmarkSet>,
    size: FrameSize,
    config: &GazeConfig,
) -> GazeDirection {
    let Some(landmarks) = landmarks else {
        return GazeDirection::Away;
    };
    if size.is_empty() {
        return GazeDirection::Away;
    }
    let Some(iris) = iris_positions(landmarks, size) else {
        return GazeDirection::Away;
    };
    let Some(relative) = mean_relative_position(landmarks, size, &iris) else {
        return GazeDirection::Center;
    };

    let threshold = effective_threshold(iris.mean().0, size.width as f64, config);
    if relative < 0.5 - threshold {
        GazeDirection::Left
    } else if relative > 0.5 + threshold {
        GazeDirection::Right
    } else {
        GazeDirection::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::test_support::face;

    const SIZE: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    #[test]
    fn no_face_is_away() {
        assert_eq!(
            classify_gaze(None, SIZE, &GazeConfig::default()),
            GazeDirection::Away
        );
        let empty = LandmarkSet::default();
        assert_eq!(
            classify_gaze(Some(&empty), SIZE, &GazeConfig::default()),
            GazeDirection::Away
        );
    }

    #[test]
    fn centred_iris_is_center() {
        let set = face().iris_at(0.5).build();
        assert_eq!(
            classify_gaze(Some(&set), SIZE, &GazeConfig::default()),
            GazeDirection::Center
        );
    }

    #[test]
    fn iris_near_inner_corner_is_left() {
        let set = face().iris_at(0.1).build();
        assert_eq!(
            classify_gaze(Some(&set), SIZE, &GazeConfig::default()),
            GazeDirection::Left
        );
    }

    #[test]
    fn iris_near_outer_corner_is_right() {
        let set = face().iris_at(0.9).build();
        assert_eq!(
            classify_gaze(Some(&set), SIZE, &GazeConfig::default()),
            GazeDirection::Right
        );
    }

    #[test]
    fn collapsed_eye_span_falls_back_to_center() {
        let set = face().iris_at(0.05).collapse_left_eye().build();
        assert_eq!(
            classify_gaze(Some(&set), SIZE, &GazeConfig::default()),
            GazeDirection::Center
        );
    }

    #[test]
    fn off_centre_face_lowers_threshold() {
        let config = GazeConfig::default();
        // Face centred in frame: threshold is base + adjustment.
        assert!((effective_threshold(320.0, 640.0, &config) - 0.25).abs() < 1e-12);
        // Irises far to the side: base - adjustment.
        assert!((effective_threshold(600.0, 640.0, &config) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn relative_position_of_0_3_depends_on_face_placement() {
        let config = GazeConfig::default();
        // Centred face, 0.3 is inside 0.5 +/- 0.25.
        let centred = face().iris_at(0.3).build();
        assert_eq!(
            classify_gaze(Some(&centred), SIZE, &config),
            GazeDirection::Center
        );
        // Same relative position with the face near the right edge: 0.3 < 0.35.
        let shifted = face().shift_x(0.35).iris_at(0.3).build();
        assert_eq!(
            classify_gaze(Some(&shifted), SIZE, &config),
            GazeDirection::Left
        );
    }

    #[test]
    fn iris_diameter_is_quarter_of_left_span() {
        let set = face().build();
        let span = eye_span(&set, SIZE, index::LEFT_EYE_INNER, index::LEFT_EYE_OUTER).unwrap();
        assert!((iris_diameter(&set, SIZE).unwrap() - span * 0.25).abs() < 1e-9);
    }
}
