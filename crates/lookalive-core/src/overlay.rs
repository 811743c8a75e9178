//! Text rendering of the session state for the on-screen overlay.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::gaze::{GazeDirection, IrisPositions};
use crate::status::{IndicatorColor, TrayStatus};

/// Headline state, in display priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "direction", rename_all = "snake_case")]
pub enum OverlayStatus {
    OnBreak,
    TooClose,
    LookingAtScreen,
    Looking(GazeDirection),
    NoFace,
}

impl OverlayStatus {
    pub fn text(self) -> String {
        match self {
            OverlayStatus::OnBreak => "BREAK TIME".to_string(),
            OverlayStatus::TooClose => "TOO CLOSE!".to_string(),
            OverlayStatus::LookingAtScreen => "Looking at Screen".to_string(),
            OverlayStatus::Looking(dir) => format!("Looking {}", title_case(dir.as_str())),
            OverlayStatus::NoFace => "No Face Detected".to_string(),
        }
    }

    fn compact_text(self) -> String {
        match self {
            OverlayStatus::OnBreak => "BREAK".to_string(),
            OverlayStatus::TooClose => "TOO CLOSE".to_string(),
            OverlayStatus::LookingAtScreen => "OK".to_string(),
            OverlayStatus::Looking(dir) => dir.as_str().to_uppercase(),
            OverlayStatus::NoFace => "NO FACE".to_string(),
        }
    }

    pub fn color(self) -> IndicatorColor {
        match self {
            OverlayStatus::OnBreak => IndicatorColor::Orange,
            OverlayStatus::TooClose => IndicatorColor::Red,
            OverlayStatus::LookingAtScreen | OverlayStatus::Looking(_) => IndicatorColor::Green,
            OverlayStatus::NoFace => IndicatorColor::Gray,
        }
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub iris_positions: Option<IrisPositions>,
    pub iris_diameter: Option<f64>,
    pub blink_count: u32,
    pub distance_baseline: Option<f64>,
}

/// Read-only view of one moment of a tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    pub status: OverlayStatus,
    pub time_to_break_secs: i64,
    pub break_remaining_secs: Option<i64>,
    pub blink_rate: f64,
    pub screen_minutes: i64,
    pub warning: Option<String>,
    pub compact: bool,
    pub debug: Option<DebugInfo>,
}

impl OverlaySnapshot {
    pub fn tray_status(&self) -> TrayStatus {
        TrayStatus::new(self.status.text(), self.status.color())
    }

    pub fn render(&self) -> String {
        if self.compact {
            self.render_compact()
        } else {
            self.render_full()
        }
    }

    fn countdown(&self) -> String {
        match self.break_remaining_secs {
            Some(secs) => format!("Break: {secs}s remaining"),
            None => {
                let secs = self.time_to_break_secs.max(0);
                format!("Next break in: {}:{:02}", secs / 60, secs % 60)
            }
        }
    }

    fn render_full(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.status.text());
        let _ = writeln!(out, "{}", self.countdown());
        let _ = writeln!(
            out,
            "Blinks: {:.0}/min | Screen: {}min",
            self.blink_rate, self.screen_minutes
        );
        if let Some(warning) = &self.warning {
            let _ = writeln!(out, "! {warning}");
        }
        if let Some(debug) = &self.debug {
            match debug.iris_positions {
                Some(iris) => {
                    let _ = write!(
                        out,
                        "Iris L ({:.0}, {:.0}) R ({:.0}, {:.0})",
                        iris.left.0, iris.left.1, iris.right.0, iris.right.1
                    );
                }
                None => out.push_str("Iris: -"),
            }
            if let Some(d) = debug.iris_diameter {
                let _ = write!(out, " | Diameter: {d:.1}px");
            }
            let _ = write!(out, " | Blinks counted: {}", debug.blink_count);
            match debug.distance_baseline {
                Some(b) => {
                    let _ = writeln!(out, " | Baseline: {b:.0}px");
                }
                None => out.push_str(" | Baseline: calibrating\n"),
            }
        }
        out
    }

    fn render_compact(&self) -> String {
        let mut text = self.status.compact_text();
        if let Some(secs) = self.break_remaining_secs {
            let _ = write!(text, " {secs}s");
        } else {
            let secs = self.time_to_break_secs.max(0);
            let _ = write!(text, " | {}:{:02}", secs / 60, secs % 60);
        }
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: OverlayStatus) -> OverlaySnapshot {
        OverlaySnapshot {
            status,
            time_to_break_secs: 754,
            break_remaining_secs: None,
            blink_rate: 14.6,
            screen_minutes: 7,
            warning: None,
            compact: false,
            debug: None,
        }
    }

    #[test]
    fn full_render_shows_countdown_and_stats() {
        let text = snapshot(OverlayStatus::LookingAtScreen).render();
        assert_eq!(
            text,
            "Looking at Screen\nNext break in: 12:34\nBlinks: 15/min | Screen: 7min\n"
        );
    }

    #[test]
    fn break_shows_remaining() {
        let mut snap = snapshot(OverlayStatus::OnBreak);
        snap.break_remaining_secs = Some(12);
        assert!(snap.render().contains("Break: 12s remaining"));
        snap.compact = true;
        assert_eq!(snap.render(), "BREAK 12s\n");
    }

    #[test]
    fn direction_is_title_cased() {
        assert_eq!(OverlayStatus::Looking(GazeDirection::Left).text(), "Looking Left");
        let mut snap = snapshot(OverlayStatus::Looking(GazeDirection::Right));
        snap.compact = true;
        assert_eq!(snap.render(), "RIGHT | 12:34\n");
    }

    #[test]
    fn debug_and_warning_lines() {
        let mut snap = snapshot(OverlayStatus::TooClose);
        snap.warning = Some("Blink more! (dry eyes)".into());
        snap.debug = Some(DebugInfo {
            iris_positions: None,
            iris_diameter: Some(16.0),
            blink_count: 3,
            distance_baseline: None,
        });
        let text = snap.render();
        assert!(text.starts_with("TOO CLOSE!\n"));
        assert!(text.contains("! Blink more! (dry eyes)\n"));
        assert!(text.ends_with("Iris: - | Diameter: 16.0px | Blinks counted: 3 | Baseline: calibrating\n"));
    }

    #[test]
    fn tray_mirrors_headline() {
        let tray = snapshot(OverlayStatus::OnBreak).tray_status();
        assert_eq!(tray.text, "BREAK TIME");
        assert_eq!(tray.color, IndicatorColor::Orange);
    }
}
