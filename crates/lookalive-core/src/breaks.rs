//! Break state machine for the 20-20-20 rule.
//!
//! The machine is wall-clock driven like the rest of the core: the caller
//! passes `now` on every `update()`; there is no internal timer thread.
//!
//! ## State Transitions
//!
//! ```text
//! Watching(None) --center--> Watching(Some(t)) --center, limit reached--> OnBreak
//!        ^                         |                                        |
//!        +------- look away -------+                 break duration elapsed |
//!        +--------------------------------------------------------------------+
//! ```

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::gaze::GazeDirection;
use crate::storage::TimerConfig;

/// Edge-triggered transition produced by [`BreakStateMachine::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakEvent {
    StartBreak,
    EndBreak,
}

/// Timer state.
///
/// `break_start` is set exactly when `break_active` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakState {
    pub screen_watch_start: Option<NaiveDateTime>,
    pub break_active: bool,
    pub break_start: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct BreakStateMachine {
    screen_time_limit: Duration,
    break_duration: Duration,
    state: BreakState,
}

impl BreakStateMachine {
    pub fn new(screen_time_limit: Duration, break_duration: Duration) -> Self {
        Self {
            screen_time_limit,
            break_duration,
            state: BreakState::default(),
        }
    }

    pub fn from_config(config: &TimerConfig) -> Self {
        Self::new(config.screen_time_limit(), config.break_duration())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &BreakState {
        &self.state
    }

    pub fn is_on_break(&self) -> bool {
        self.state.break_active
    }

    pub fn screen_time_limit(&self) -> Duration {
        self.screen_time_limit
    }

    pub fn break_duration(&self) -> Duration {
        self.break_duration
    }

    /// Length of the current screen-watch window.
    pub fn screen_time(&self, now: NaiveDateTime) -> Duration {
        self.state
            .screen_watch_start
            .map(|start| (now - start).max(Duration::zero()))
            .unwrap_or_else(Duration::zero)
    }

    /// Time left before a break is due; the full limit if not watching.
    pub fn time_to_break(&self, now: NaiveDateTime) -> Duration {
        (self.screen_time_limit - self.screen_time(now)).max(Duration::zero())
    }

    /// Time left in the current break, if one is running.
    pub fn break_remaining(&self, now: NaiveDateTime) -> Option<Duration> {
        let start = self.state.break_start?;
        Some((self.break_duration - (now - start)).max(Duration::zero()))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Advance the machine with this frame's gaze.
    ///
    /// Both the start and end checks run on every call; if both fire in the
    /// same call the end event is returned.
    pub fn update(&mut self, gaze: GazeDirection, now: NaiveDateTime) -> Option<BreakEvent> {
        let mut event = None;

        if !self.state.break_active {
            if gaze.is_center() {
                match self.state.screen_watch_start {
                    None => self.state.screen_watch_start = Some(now),
                    Some(start) if now - start >= self.screen_time_limit => {
                        self.state.break_active = true;
                        self.state.break_start = Some(now);
                        self.state.screen_watch_start = None;
                        event = Some(BreakEvent::StartBreak);
                        tracing::info!("break started after {}s of screen time", (now - start).num_seconds());
                    }
                    Some(_) => {}
                }
            } else {
                self.state.screen_watch_start = None;
            }
        }

        if let Some(start) = self.state.break_start {
            if self.state.break_active && now - start >= self.break_duration {
                self.state.break_active = false;
                self.state.break_start = None;
                self.state.screen_watch_start = None;
                event = Some(BreakEvent::EndBreak);
                tracing::info!("break ended");
            }
        }

        event
    }

    /// No face this frame: drop the watch window but keep any running break.
    pub fn reset(&mut self) {
        self.state.screen_watch_start = None;
    }
}

impl Default for BreakStateMachine {
    fn default() -> Self {
        Self::from_config(&TimerConfig::default())
    }
}
