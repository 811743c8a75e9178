//! Newline-delimited JSON landmark stream.
//!
//! Each non-blank line is either a frame
//!
//! ```json
//! {"at": "2026-03-02T09:00:00.033", "width": 640, "height": 480, "landmarks": [{"x": 0.5, "y": 0.4}], "label": "left"}
//! ```
//!
//! or an operator control such as `{"control": "reset-blinks"}`. `at`,
//! `landmarks` and `label` are optional; `"landmarks": null` is a frame
//! without a face. Controls are queued and handed out through
//! [`ControlSource::poll`] after the next frame has been read.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::landmarks::{FrameSize, LandmarkSet};
use crate::source::{CaptureSource, Control, ControlSource, Frame, LandmarkSource};

#[derive(Debug, Deserialize)]
struct FrameRecord {
    #[serde(default)]
    at: Option<NaiveDateTime>,
    width: u32,
    height: u32,
    #[serde(default)]
    landmarks: Option<LandmarkSet>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ControlRecord {
    control: Control,
}

pub struct ReplaySource<R> {
    reader: R,
    line_no: usize,
    controls: VecDeque<Control>,
    name: String,
}

impl ReplaySource<Box<dyn BufRead>> {
    /// Open a recording; `-` reads standard input.
    ///
    /// # Errors
    ///
    /// A file that cannot be opened is a capture error.
    pub fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self::new(Box::new(BufReader::new(io::stdin())), "<stdin>"));
        }
        let file = File::open(path)
            .map_err(|e| CoreError::Capture(format!("cannot open {}: {e}", path.display())))?;
        Ok(Self::new(
            Box::new(BufReader::new(file)),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            line_no: 0,
            controls: VecDeque::new(),
            name: name.into(),
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> CoreError {
        CoreError::Capture(format!("{} line {}: {message}", self.name, self.line_no))
    }

    fn parse_frame(&self, value: serde_json::Value) -> Result<Frame> {
        let record: FrameRecord = serde_json::from_value(value).map_err(|e| self.error(e))?;
        Ok(Frame {
            at: record.at,
            size: FrameSize::new(record.width, record.height),
            landmarks: record.landmarks,
            label: record.label,
        })
    }
}

impl<R: BufRead> CaptureSource for ReplaySource<R> {
    fn read(&mut self) -> Result<Option<Frame>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .map_err(|e| CoreError::Capture(format!("{}: {e}", self.name)))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let value: serde_json::Value =
                serde_json::from_str(trimmed).map_err(|e| self.error(e))?;
            if value.get("control").is_some() {
                let record: ControlRecord =
                    serde_json::from_value(value).map_err(|e| self.error(e))?;
                self.controls.push_back(record.control);
                continue;
            }

            let frame = self.parse_frame(value)?;
            tracing::trace!(line = self.line_no, "replay frame");
            return Ok(Some(frame));
        }
    }
}

impl<R> LandmarkSource for ReplaySource<R> {
    fn process(&mut self, frame: &Frame) -> Option<LandmarkSet> {
        frame.landmarks.clone().filter(|l| !l.is_empty())
    }
}

impl<R> ControlSource for ReplaySource<R> {
    fn poll(&mut self) -> Option<Control> {
        self.controls.pop_front()
    }
}
