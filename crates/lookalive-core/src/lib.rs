//! # LookAlive Core Library
//!
//! Core logic for the LookAlive 20-20-20 eye-break assistant. Face-mesh
//! landmarks come in one frame at a time; out come a gaze/blink/proximity
//! classification, break reminders and an hourly screen-usage ledger.
//!
//! ## Architecture
//!
//! - **Gaze**: per-frame classifier with blink hysteresis and a median
//!   distance baseline
//! - **Breaks**: a wall-clock state machine; the caller passes `now` on every
//!   `update()`
//! - **Usage**: per-hour accumulator flushed into a JSON ledger on hour change
//!   and at session end
//! - **Session**: one context object owning all of the above; there is no
//!   process-wide state
//!
//! ## Key Components
//!
//! - [`GazeClassifier`]: gaze direction, blinks and "too close" detection
//! - [`BreakStateMachine`]: screen-watch timer and breaks
//! - [`UsageAggregator`]: hourly screen minutes and heatmaps
//! - [`TrackingSession`]: the per-frame entry point
//! - [`Config`]: TOML configuration

pub mod breaks;
pub mod calibration;
pub mod error;
pub mod events;
pub mod gaze;
pub mod landmarks;
pub mod notify;
pub mod overlay;
pub mod replay;
pub mod session;
pub mod source;
pub mod status;
pub mod storage;
pub mod usage;

pub use breaks::{BreakEvent, BreakState, BreakStateMachine};
pub use calibration::{CalibrationPosition, ScreenBounds, ScreenCalibration};
pub use error::{ConfigError, CoreError, ValidationError};
pub use events::{BlinkRateIssue, Event};
pub use gaze::{GazeAnalysis, GazeClassifier, GazeDirection};
pub use landmarks::{FrameSize, LandmarkSet, Point};
pub use notify::{Notification, Notifier, NotifyError};
pub use overlay::OverlaySnapshot;
pub use replay::ReplaySource;
pub use session::{FrameOutcome, SessionSummary, TrackingSession};
pub use source::{CaptureSource, Control, ControlSource, Frame, LandmarkSource};
pub use status::{StatusBoard, TrayStatus};
pub use storage::{Config, LoadOutcome};
pub use usage::{HourlyHeatmap, SessionReport, UsageAggregator, UsageLedger, WeeklySummary};
