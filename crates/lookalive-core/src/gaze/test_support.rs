//! Synthetic face meshes for classifier tests.

use crate::landmarks::{index, LandmarkSet, Point, REQUIRED_LANDMARKS};

pub(crate) fn face() -> FaceBuilder {
    FaceBuilder::default()
}

/// Builds a full-size landmark set with only the classifier's points placed.
///
/// Eyes sit at x 0.35..0.45 (left) and 0.55..0.65 (right), y 0.45.
pub(crate) struct FaceBuilder {
    iris_relative: f64,
    closed: bool,
    collapse_left: bool,
    shift_x: f64,
    scale: f64,
}

impl Default for FaceBuilder {
    fn default() -> Self {
        Self {
            iris_relative: 0.5,
            closed: false,
            collapse_left: false,
            shift_x: 0.0,
            scale: 1.0,
        }
    }
}

impl FaceBuilder {
    pub(crate) fn iris_at(mut self, relative: f64) -> Self {
        self.iris_relative = relative;
        self
    }

    pub(crate) fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub(crate) fn collapse_left_eye(mut self) -> Self {
        self.collapse_left = true;
        self
    }

    pub(crate) fn shift_x(mut self, dx: f64) -> Self {
        self.shift_x = dx;
        self
    }

    /// Scale horizontally about the frame centre, as if moving closer.
    pub(crate) fn scale(mut self, factor: f64) -> Self {
        self.scale = factor;
        self
    }

    pub(crate) fn build(self) -> LandmarkSet {
        let mut points = vec![Point::new(0.5, 0.5); REQUIRED_LANDMARKS];
        let x = |v: f64| 0.5 + (v - 0.5) * self.scale + self.shift_x;
        let (lid_top, lid_bottom) = if self.closed { (0.449, 0.451) } else { (0.43, 0.47) };

        let left_outer = if self.collapse_left { 0.35 } else { 0.45 };
        let eyes = [
            (
                index::LEFT_EYE_INNER,
                index::LEFT_EYE_OUTER,
                index::LEFT_EYE_TOP,
                index::LEFT_EYE_BOTTOM,
                index::LEFT_IRIS_CENTER,
                0.35,
                left_outer,
            ),
            (
                index::RIGHT_EYE_INNER,
                index::RIGHT_EYE_OUTER,
                index::RIGHT_EYE_TOP,
                index::RIGHT_EYE_BOTTOM,
                index::RIGHT_IRIS_CENTER,
                0.55,
                0.65,
            ),
        ];

        for (inner, outer, top, bottom, iris, inner_x, outer_x) in eyes {
            let mid = inner_x + 0.05;
            points[inner] = Point::new(x(inner_x), 0.45);
            points[outer] = Point::new(x(outer_x), 0.45);
            points[top] = Point::new(x(mid), lid_top);
            points[bottom] = Point::new(x(mid), lid_bottom);
            let iris_x = inner_x + self.iris_relative * 0.1;
            points[iris] = Point::new(x(iris_x), 0.45);
        }

        LandmarkSet::new(points)
    }
}
