//! Seams to the outside world: frames in, landmarks out, operator controls.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};
use crate::landmarks::{FrameSize, LandmarkSet};

/// One captured frame.
///
/// Pixel data stays with the capture device; the core only needs the frame
/// geometry and, once the face-mesh model has run, its landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Capture time; `None` means "now" to the consumer.
    pub at: Option<NaiveDateTime>,
    pub size: FrameSize,
    pub landmarks: Option<LandmarkSet>,
    /// Free-form tag attached by the producer (calibration uses it).
    pub label: Option<String>,
}

/// Source of frames. `Ok(None)` means the stream has ended.
///
/// Errors are device failures and end the session.
pub trait CaptureSource {
    fn read(&mut self) -> Result<Option<Frame>>;
}

/// Face-mesh model contract: landmarks for the single tracked face, if any.
pub trait LandmarkSource {
    fn process(&mut self, frame: &Frame) -> Option<LandmarkSet>;
}

/// Non-blocking poll for operator commands.
pub trait ControlSource {
    fn poll(&mut self) -> Option<Control>;
}

/// Landmark source for frames that already carry their landmarks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Precomputed;

impl LandmarkSource for Precomputed {
    fn process(&mut self, frame: &Frame) -> Option<LandmarkSet> {
        frame.landmarks.clone().filter(|l| !l.is_empty())
    }
}

/// Operator command from the keyboard, tray menu or a replay stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Control {
    Quit,
    ResetBlinks,
    ToggleDebug,
    ToggleCompact,
    ResetDistance,
    ShowHeatmap,
    Minimize,
    Restore,
}

impl Control {
    pub fn as_str(self) -> &'static str {
        match self {
            Control::Quit => "quit",
            Control::ResetBlinks => "reset-blinks",
            Control::ToggleDebug => "toggle-debug",
            Control::ToggleCompact => "toggle-compact",
            Control::ResetDistance => "reset-distance",
            Control::ShowHeatmap => "show-heatmap",
            Control::Minimize => "minimize",
            Control::Restore => "restore",
        }
    }

    /// Keyboard shortcut mapping.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'q' => Some(Control::Quit),
            'r' => Some(Control::ResetBlinks),
            'd' => Some(Control::ToggleDebug),
            'c' => Some(Control::ToggleCompact),
            'x' => Some(Control::ResetDistance),
            'h' => Some(Control::ShowHeatmap),
            'm' => Some(Control::Minimize),
            's' => Some(Control::Restore),
            _ => None,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Control {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
            ValidationError::InvalidValue {
                field: "control".into(),
                message: format!("unknown control '{s}'"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_names_roundtrip() {
        for control in [
            Control::Quit,
            Control::ResetBlinks,
            Control::ToggleDebug,
            Control::ToggleCompact,
            Control::ResetDistance,
            Control::ShowHeatmap,
            Control::Minimize,
            Control::Restore,
        ] {
            assert_eq!(control.as_str().parse::<Control>().unwrap(), control);
        }
        assert!("explode".parse::<Control>().is_err());
    }

    #[test]
    fn keys_map_to_controls() {
        assert_eq!(Control::from_key('Q'), Some(Control::Quit));
        assert_eq!(Control::from_key('r'), Some(Control::ResetBlinks));
        assert_eq!(Control::from_key('z'), None);
    }

    #[test]
    fn precomputed_treats_empty_as_no_face() {
        let frame = Frame {
            at: None,
            size: FrameSize::new(640, 480),
            landmarks: Some(LandmarkSet::default()),
            label: None,
        };
        assert!(Precomputed.process(&frame).is_none());
    }
}
