//! Blink detection with frame-count hysteresis.
//!
//! A frame counts as "closed" when the eye aspect ratio (eyelid gap over eye
//! corner span, averaged over both eyes) drops below the configured
//! threshold. A blink is only counted when a closed run of at least
//! `min_closed_frames` is followed by `min_open_frames` open frames, and at
//! least `min_interval_ms` has passed since the previous counted blink.
//!
//! ```text
//! open ──closed──▶ closing run ──open──▶ reopening ──N open──▶ counted / discarded
//!                      ▲                     │
//!                      └──────closed─────────┘   (flicker merges into the run)
//! ```

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::landmarks::{index, FrameSize, LandmarkSet};
use crate::storage::BlinkConfig;

/// Eye aspect ratio averaged over both eyes.
///
/// `None` if any eyelid or corner landmark is missing, or both eye spans
/// have collapsed.
pub fn eye_aspect_ratio(landmarks: &LandmarkSet, size: FrameSize) -> Option<f64> {
    let eyes = [
        (
            index::LEFT_EYE_TOP,
            index::LEFT_EYE_BOTTOM,
            index::LEFT_EYE_INNER,
            index::LEFT_EYE_OUTER,
        ),
        (
            index::RIGHT_EYE_TOP,
            index::RIGHT_EYE_BOTTOM,
            index::RIGHT_EYE_INNER,
            index::RIGHT_EYE_OUTER,
        ),
    ];

    let mut ratios = Vec::with_capacity(2);
    for (top, bottom, inner, outer) in eyes {
        let (_, top_y) = landmarks.pixel(top, size)?;
        let (_, bottom_y) = landmarks.pixel(bottom, size)?;
        let (inner_x, _) = landmarks.pixel(inner, size)?;
        let (outer_x, _) = landmarks.pixel(outer, size)?;

        let width = (outer_x - inner_x).abs();
        if width > f64::EPSILON {
            ratios.push((top_y - bottom_y).abs() / width);
        }
    }

    if ratios.is_empty() {
        return None;
    }
    Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
}

/// Mutable blink bookkeeping for one tracking session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlinkState {
    pub blink_counter: u32,
    /// Time of the first counted blink since the last reset.
    pub blink_window_start: Option<NaiveDateTime>,
    pub consecutive_closed_frames: u32,
    pub consecutive_open_frames: u32,
    pub prev_closed: bool,
    pub last_blink_time: Option<NaiveDateTime>,
    /// Closed run waiting for enough open frames to be judged.
    pending_closed_run: u32,
}

/// Counts validated blinks and derives a blink rate.
#[derive(Debug, Clone)]
pub struct BlinkTracker {
    config: BlinkConfig,
    state: BlinkState,
}

impl BlinkTracker {
    pub fn new(config: BlinkConfig) -> Self {
        Self {
            config,
            state: BlinkState::default(),
        }
    }

    pub fn state(&self) -> &BlinkState {
        &self.state
    }

    pub fn count(&self) -> u32 {
        self.state.blink_counter
    }

    /// Whether the eyes are closed in this frame; updates blink counting.
    ///
    /// Missing landmarks report "open" and leave the state untouched.
    pub fn detect(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        size: FrameSize,
        now: NaiveDateTime,
    ) -> bool {
        let Some(ear) = landmarks.and_then(|l| eye_aspect_ratio(l, size)) else {
            return false;
        };
        let closed = ear < self.config.ear_threshold;
        self.observe(closed, now);
        closed
    }

    /// Feed one frame's open/closed state. Returns true if a blink was
    /// counted on this frame.
    pub fn observe(&mut self, closed: bool, now: NaiveDateTime) -> bool {
        let state = &mut self.state;
        let mut counted = false;

        if closed {
            if !state.prev_closed {
                // Reopened too briefly: the earlier run is dropped, not extended.
                state.pending_closed_run = 0;
                state.consecutive_closed_frames = 0;
            }
            state.consecutive_closed_frames += 1;
            state.consecutive_open_frames = 0;
        } else {
            if state.prev_closed {
                state.pending_closed_run = std::mem::take(&mut state.consecutive_closed_frames);
            }
            state.consecutive_open_frames += 1;

            if state.pending_closed_run > 0
                && state.consecutive_open_frames >= self.config.min_open_frames
            {
                let run = std::mem::take(&mut state.pending_closed_run);
                let min_interval = Duration::milliseconds(self.config.min_interval_ms as i64);
                let spaced = state
                    .last_blink_time
                    .map_or(true, |last| now - last >= min_interval);

                if run >= self.config.min_closed_frames && spaced {
                    state.blink_counter += 1;
                    state.last_blink_time = Some(now);
                    state.blink_window_start.get_or_insert(now);
                    counted = true;
                    tracing::debug!(count = state.blink_counter, run, "blink counted");
                }
            }
        }

        state.prev_closed = closed;
        counted
    }

    /// Blinks per minute since the first counted blink.
    ///
    /// Zero until a blink has been counted and `rate_warmup_secs` have passed
    /// since it.
    pub fn blink_rate(&self, now: NaiveDateTime) -> f64 {
        let Some(start) = self.state.blink_window_start else {
            return 0.0;
        };
        if self.state.blink_counter == 0 {
            return 0.0;
        }

        let elapsed_secs = (now - start).num_milliseconds() as f64 / 1000.0;
        if elapsed_secs < self.config.rate_warmup_secs as f64 || elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.state.blink_counter as f64 / (elapsed_secs / 60.0)
    }

    /// Operator reset: forget counted blinks and any run in progress.
    pub fn reset(&mut self) {
        self.state = BlinkState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::test_support::face;
    use chrono::NaiveDate;

    const SIZE: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    /// Feed `pattern` at 30 fps starting at `start`; returns blinks counted.
    fn feed(tracker: &mut BlinkTracker, pattern: &[bool], start: NaiveDateTime) -> u32 {
        let mut counted = 0;
        for (i, closed) in pattern.iter().enumerate() {
            let now = start + Duration::milliseconds(i as i64 * 33);
            if tracker.observe(*closed, now) {
                counted += 1;
            }
        }
        counted
    }

    const BLINK: [bool; 6] = [true, true, true, false, false, false];

    #[test]
    fn ear_separates_open_and_closed_eyes() {
        let open = eye_aspect_ratio(&face().build(), SIZE).unwrap();
        let closed = eye_aspect_ratio(&face().closed().build(), SIZE).unwrap();
        assert!(open > 0.15, "open EAR {open}");
        assert!(closed < 0.15, "closed EAR {closed}");
    }

    #[test]
    fn detect_reports_instantaneous_state() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        assert!(tracker.detect(Some(&face().closed().build()), SIZE, t0()));
        assert!(!tracker.detect(Some(&face().build()), SIZE, t0()));
        assert!(!tracker.detect(None, SIZE, t0()));
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn full_closed_then_open_run_counts_once() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        assert_eq!(feed(&mut tracker, &BLINK, t0()), 1);
        assert_eq!(tracker.count(), 1);
        assert_eq!(tracker.state().last_blink_time, Some(t0() + Duration::milliseconds(4 * 33)));
    }

    #[test]
    fn short_closure_is_noise() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        feed(&mut tracker, &[true, true, false, false, false], t0());
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn single_open_frame_is_not_enough() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        feed(&mut tracker, &[true, true, true, false], t0());
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn short_runs_split_by_one_open_frame_are_not_merged() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        let pattern = [true, true, false, true, false, false];
        assert_eq!(feed(&mut tracker, &pattern, t0()), 0);

        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        let pattern = [true, true, false, true, true, false, false];
        assert_eq!(feed(&mut tracker, &pattern, t0()), 0);
    }

    #[test]
    fn reclose_restarts_the_run() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        let pattern = [true, true, true, false, true, true, true, false, false];
        assert_eq!(feed(&mut tracker, &pattern, t0()), 1);
        assert_eq!(
            tracker.state().last_blink_time,
            Some(t0() + Duration::milliseconds(8 * 33))
        );
    }

    #[test]
    fn replay_within_interval_counts_once() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        feed(&mut tracker, &BLINK, t0());
        feed(&mut tracker, &BLINK, t0() + Duration::milliseconds(400));
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn replay_after_interval_counts_twice() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        feed(&mut tracker, &BLINK, t0());
        feed(&mut tracker, &BLINK, t0() + Duration::milliseconds(1200));
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn rate_is_zero_during_warmup() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        feed(&mut tracker, &BLINK, t0());
        let first = tracker.state().blink_window_start.unwrap();
        assert_eq!(tracker.blink_rate(first + Duration::seconds(59)), 0.0);
        assert!(tracker.blink_rate(first + Duration::seconds(60)) > 0.0);
    }

    #[test]
    fn rate_is_count_per_minute() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        for i in 0..10 {
            feed(&mut tracker, &BLINK, t0() + Duration::seconds(i * 6));
        }
        let first = tracker.state().blink_window_start.unwrap();
        let rate = tracker.blink_rate(first + Duration::seconds(120));
        assert!((rate - 5.0).abs() < 1e-9, "rate {rate}");
    }

    #[test]
    fn no_blinks_means_zero_rate() {
        let tracker = BlinkTracker::new(BlinkConfig::default());
        assert_eq!(tracker.blink_rate(t0() + Duration::hours(1)), 0.0);
    }

    #[test]
    fn reset_clears_counter_and_window() {
        let mut tracker = BlinkTracker::new(BlinkConfig::default());
        feed(&mut tracker, &BLINK, t0());
        tracker.reset();
        assert_eq!(tracker.state(), &BlinkState::default());
        feed(&mut tracker, &BLINK, t0() + Duration::milliseconds(300));
        assert_eq!(tracker.count(), 1, "interval restarts after reset");
    }
}
