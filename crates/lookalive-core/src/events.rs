use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::source::Control;

/// Which way the blink rate is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlinkRateIssue {
    /// Too few blinks; dry eyes.
    Low,
    /// Too many blinks; possible eye strain.
    High,
}

impl BlinkRateIssue {
    pub fn message(self) -> &'static str {
        match self {
            BlinkRateIssue::Low => "Blink more! (dry eyes)",
            BlinkRateIssue::High => "High blink rate (eye strain?)",
        }
    }
}

/// Every observable state change in a tracking session produces an Event.
/// The CLI prints them as JSON lines; the overlay reads the latest warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    BreakStarted {
        screen_time_secs: i64,
        at: NaiveDateTime,
    },
    BreakEnded {
        at: NaiveDateTime,
    },
    /// First frame without a face after frames with one.
    FaceLost {
        at: NaiveDateTime,
    },
    FaceFound {
        at: NaiveDateTime,
    },
    /// The user leaned in past the distance baseline.
    TooClose {
        at: NaiveDateTime,
    },
    DistanceCalibrated {
        baseline_px: f64,
        at: NaiveDateTime,
    },
    BlinkRateWarning {
        issue: BlinkRateIssue,
        rate: f64,
        message: String,
        at: NaiveDateTime,
    },
    ControlApplied {
        control: Control,
        at: NaiveDateTime,
    },
}

impl Event {
    pub fn at(&self) -> NaiveDateTime {
        match self {
            Event::BreakStarted { at, .. }
            | Event::BreakEnded { at }
            | Event::FaceLost { at }
            | Event::FaceFound { at }
            | Event::TooClose { at }
            | Event::DistanceCalibrated { at, .. }
            | Event::BlinkRateWarning { at, .. }
            | Event::ControlApplied { at, .. } => *at,
        }
    }
}
