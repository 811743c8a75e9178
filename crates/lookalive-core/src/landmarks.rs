//! Facial landmark value types.
//!
//! A [`LandmarkSet`] is the output of the external face-mesh model for one
//! frame: an ordered list of points in normalized frame coordinates. The
//! indices consumed by the classifier are a fixed contract with that model
//! and live in [`index`].

use serde::{Deserialize, Serialize};

/// Number of points a refined face mesh (468 face + 10 iris) produces.
pub const REQUIRED_LANDMARKS: usize = 478;

/// Landmark indices consumed by the classifier.
///
/// "Left"/"right" follow the face-mesh numbering. Each eye has an inner and an
/// outer corner; relative iris position is measured from the inner corner.
pub mod index {
    pub const LEFT_IRIS_CENTER: usize = 468;
    pub const RIGHT_IRIS_CENTER: usize = 473;

    pub const LEFT_EYE_INNER: usize = 33;
    pub const LEFT_EYE_OUTER: usize = 133;
    pub const RIGHT_EYE_INNER: usize = 362;
    pub const RIGHT_EYE_OUTER: usize = 263;

    pub const LEFT_EYE_TOP: usize = 159;
    pub const LEFT_EYE_BOTTOM: usize = 145;
    pub const RIGHT_EYE_TOP: usize = 386;
    pub const RIGHT_EYE_BOTTOM: usize = 374;
}

/// A 2D landmark in normalized coordinates (0..1 relative to the frame).
///
/// The model also reports a depth value; it is accepted on input and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert to pixel coordinates for the given frame.
    pub fn to_pixels(self, size: FrameSize) -> (f64, f64) {
        (self.x * size.width as f64, self.y * size.height as f64)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pixel dimensions of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Landmarks for a single detected face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Point at `idx`, or `None` when the set is too short or the point is
    /// not a finite coordinate.
    pub fn get(&self, idx: usize) -> Option<Point> {
        self.points.get(idx).copied().filter(Point::is_finite)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether every index the classifier reads is present.
    pub fn is_complete(&self) -> bool {
        self.points.len() >= REQUIRED_LANDMARKS
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Pixel position of landmark `idx`.
    pub fn pixel(&self, idx: usize, size: FrameSize) -> Option<(f64, f64)> {
        self.get(idx).map(|p| p.to_pixels(size))
    }
}

impl From<Vec<Point>> for LandmarkSet {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_rejects_out_of_range_and_nan() {
        let set = LandmarkSet::new(vec![Point::new(0.5, 0.5), Point::new(f64::NAN, 0.1)]);
        assert!(set.get(0).is_some());
        assert!(set.get(1).is_none());
        assert!(set.get(index::LEFT_IRIS_CENTER).is_none());
        assert!(!set.is_complete());
    }

    #[test]
    fn pixel_scales_by_frame() {
        let set = LandmarkSet::new(vec![Point::new(0.25, 0.5)]);
        assert_eq!(set.pixel(0, FrameSize::new(640, 480)), Some((160.0, 240.0)));
    }

    #[test]
    fn deserializes_mesh_points_ignoring_depth() {
        let set: LandmarkSet =
            serde_json::from_str(r#"[{"x":0.1,"y":0.2,"z":-0.03},{"x":0.3,"y":0.4}]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some(Point::new(0.3, 0.4)));
    }
}
