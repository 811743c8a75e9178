//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use lookalive_core::landmarks::{index, LandmarkSet, Point, REQUIRED_LANDMARKS};
use lookalive_core::FrameSize;

pub const SIZE: FrameSize = FrameSize {
    width: 640,
    height: 480,
};

/// 2026-03-02 09:00:00 plus `secs`.
pub fn at(secs: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        + Duration::seconds(secs)
}

/// Face mesh with the iris at `relative` (0 = inner corner, 1 = outer) in
/// both eyes. Eyes span x 0.35..0.45 and 0.55..0.65 at y 0.45.
pub fn face(relative: f64, closed: bool) -> LandmarkSet {
    let mut points = vec![Point::new(0.5, 0.5); REQUIRED_LANDMARKS];
    let (top, bottom) = if closed { (0.449, 0.451) } else { (0.43, 0.47) };
    let eyes = [
        (
            index::LEFT_EYE_INNER,
            index::LEFT_EYE_OUTER,
            index::LEFT_EYE_TOP,
            index::LEFT_EYE_BOTTOM,
            index::LEFT_IRIS_CENTER,
            0.35,
        ),
        (
            index::RIGHT_EYE_INNER,
            index::RIGHT_EYE_OUTER,
            index::RIGHT_EYE_TOP,
            index::RIGHT_EYE_BOTTOM,
            index::RIGHT_IRIS_CENTER,
            0.55,
        ),
    ];
    for (inner, outer, lid_top, lid_bottom, iris, x) in eyes {
        points[inner] = Point::new(x, 0.45);
        points[outer] = Point::new(x + 0.1, 0.45);
        points[lid_top] = Point::new(x + 0.05, top);
        points[lid_bottom] = Point::new(x + 0.05, bottom);
        points[iris] = Point::new(x + relative * 0.1, 0.45);
    }
    LandmarkSet::new(points)
}

pub fn centered() -> LandmarkSet {
    face(0.5, false)
}

/// One replay line for `landmarks` at `secs`.
pub fn frame_line(secs: i64, landmarks: Option<&LandmarkSet>) -> String {
    serde_json::json!({
        "at": at(secs),
        "width": SIZE.width,
        "height": SIZE.height,
        "landmarks": landmarks,
    })
    .to_string()
}
