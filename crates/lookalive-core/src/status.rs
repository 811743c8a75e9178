//! Status shared with the background indicator.
//!
//! The frame loop is the only writer and the indicator thread the only
//! reader. Last write wins.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    Green,
    Orange,
    Red,
    Gray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrayStatus {
    pub text: String,
    pub color: IndicatorColor,
    pub minimized: bool,
}

impl TrayStatus {
    pub fn new(text: impl Into<String>, color: IndicatorColor) -> Self {
        Self {
            text: text.into(),
            color,
            minimized: false,
        }
    }

    pub fn running() -> Self {
        Self::new("Running", IndicatorColor::Green)
    }

    pub fn minimized() -> Self {
        Self {
            text: "Minimized (running)".into(),
            color: IndicatorColor::Gray,
            minimized: true,
        }
    }

    /// Indicator title, e.g. `LookAlive - Running`.
    pub fn title(&self) -> String {
        format!("LookAlive - {}", self.text)
    }
}

impl Default for TrayStatus {
    fn default() -> Self {
        Self::running()
    }
}

/// Cloneable handle to the current [`TrayStatus`].
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<TrayStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, status: TrayStatus) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = status;
    }

    pub fn current(&self) -> TrayStatus {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_across_clones() {
        let board = StatusBoard::new();
        let reader = board.clone();
        assert_eq!(reader.current(), TrayStatus::running());

        board.publish(TrayStatus::new("Break", IndicatorColor::Orange));
        board.publish(TrayStatus::minimized());
        let status = reader.current();
        assert!(status.minimized);
        assert_eq!(status.title(), "LookAlive - Minimized (running)");
    }

    #[test]
    fn reader_thread_sees_updates() {
        let board = StatusBoard::new();
        let reader = board.clone();
        board.publish(TrayStatus::new("TOO CLOSE!", IndicatorColor::Red));
        let seen = std::thread::spawn(move || reader.current()).join().unwrap();
        assert_eq!(seen.color, IndicatorColor::Red);
    }
}
