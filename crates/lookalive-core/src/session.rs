//! One tracking session: the classifier, break timer and usage aggregator
//! wired together behind a single frame entry point.
//!
//! The session owns all mutable tracking state. The frame loop drives it
//! with [`TrackingSession::handle_frame`] and [`TrackingSession::apply`];
//! other threads only ever see the [`StatusBoard`] handle.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::breaks::{BreakEvent, BreakStateMachine};
use crate::error::Result;
use crate::events::{BlinkRateIssue, Event};
use crate::gaze::{GazeAnalysis, GazeClassifier, GazeDirection};
use crate::landmarks::{FrameSize, LandmarkSet};
use crate::notify::{self, Notification, Notifier};
use crate::overlay::{DebugInfo, OverlaySnapshot, OverlayStatus};
use crate::source::Control;
use crate::status::{StatusBoard, TrayStatus};
use crate::storage::{resolve_in_data_dir, BlinkConfig, Config};
use crate::usage::{HourlyHeatmap, SessionReport, UsageAggregator, WeeklySummary};

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutcome {
    /// `None` when no face was found.
    pub analysis: Option<GazeAnalysis>,
    pub events: Vec<Event>,
}

/// Totals reported when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub frames: u64,
    pub frames_with_face: u64,
    pub breaks_taken: u32,
    pub total_blinks: u32,
    pub average_blink_rate: f64,
    pub usage: SessionReport,
}

pub struct TrackingSession {
    id: Uuid,
    started_at: NaiveDateTime,
    classifier: GazeClassifier,
    breaks: BreakStateMachine,
    usage: UsageAggregator,
    blink_config: BlinkConfig,
    notifier: Option<Box<dyn Notifier>>,
    notification_timeout: u32,
    status: StatusBoard,

    last_analysis: Option<GazeAnalysis>,
    face_present: Option<bool>,
    was_too_close: bool,
    was_calibrated: bool,
    last_health_warning: Option<NaiveDateTime>,
    last_warning: Option<String>,

    compact: bool,
    debug: bool,
    minimized: bool,
    quit_requested: bool,

    frames: u64,
    frames_with_face: u64,
    breaks_taken: u32,
}

impl TrackingSession {
    /// Session using `usage` for accounting and no notifier.
    pub fn new(config: &Config, usage: UsageAggregator, now: NaiveDateTime) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "tracking session started");
        Self {
            id,
            started_at: now,
            classifier: GazeClassifier::from_config(config),
            breaks: BreakStateMachine::from_config(&config.timer),
            usage,
            blink_config: config.blink.clone(),
            notifier: None,
            notification_timeout: config.notifications.timeout_secs,
            status: StatusBoard::new(),
            last_analysis: None,
            face_present: None,
            was_too_close: false,
            was_calibrated: false,
            last_health_warning: None,
            last_warning: None,
            compact: config.ui.compact,
            debug: config.ui.debug,
            minimized: false,
            quit_requested: false,
            frames: 0,
            frames_with_face: 0,
            breaks_taken: 0,
        }
    }

    /// Session persisting usage to the configured ledger and notifying
    /// through the configured backend.
    pub fn from_config(config: &Config, now: NaiveDateTime) -> Result<Self> {
        let ledger_path = resolve_in_data_dir(&config.storage.usage_file)?;
        let usage = UsageAggregator::open(ledger_path, now);
        let mut session = Self::new(config, usage, now);
        session.notifier = notify::from_config(&config.notifications);
        Ok(session)
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn without_notifier(mut self) -> Self {
        self.notifier = None;
        self
    }

    pub fn with_status_board(mut self, status: StatusBoard) -> Self {
        self.status = status;
        self
    }

    /// Replace the break timer, e.g. to override its limits from the CLI.
    pub fn with_breaks(mut self, breaks: BreakStateMachine) -> Self {
        self.breaks = breaks;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status_board(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn classifier(&self) -> &GazeClassifier {
        &self.classifier
    }

    pub fn breaks(&self) -> &BreakStateMachine {
        &self.breaks
    }

    pub fn usage(&self) -> &UsageAggregator {
        &self.usage
    }

    pub fn should_quit(&self) -> bool {
        self.quit_requested
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn today_heatmap(&self, today: NaiveDate) -> HourlyHeatmap {
        self.usage.today_heatmap(today)
    }

    pub fn weekly_summary(&self, today: NaiveDate) -> WeeklySummary {
        self.usage.weekly_summary(today)
    }

    // ── Frame loop ───────────────────────────────────────────────────

    /// Run one classify/update cycle.
    pub fn handle_frame(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        size: FrameSize,
        now: NaiveDateTime,
    ) -> FrameOutcome {
        self.frames += 1;
        let mut events = Vec::new();

        let analysis = match landmarks.filter(|l| !l.is_empty() && !size.is_empty()) {
            Some(landmarks) => {
                self.frames_with_face += 1;
                if self.face_present != Some(true) {
                    events.push(Event::FaceFound { at: now });
                }
                self.face_present = Some(true);

                let analysis = self.classifier.analyze(landmarks, size, now);
                self.track_proximity(&analysis, now, &mut events);
                self.check_blink_health(&analysis, now, &mut events);

                let screen_time = self.breaks.screen_time(now);
                let transition = self.breaks.update(analysis.direction(), now);
                self.on_break_transition(transition, screen_time, now, &mut events);

                self.usage.update(analysis.is_looking_at_screen(), now);
                Some(analysis)
            }
            None => {
                if self.face_present == Some(true) {
                    events.push(Event::FaceLost { at: now });
                }
                self.face_present = Some(false);
                self.was_too_close = false;

                self.breaks.reset();
                // A running break still has to be able to finish.
                let transition = self.breaks.update(GazeDirection::Away, now);
                self.on_break_transition(transition, Duration::zero(), now, &mut events);

                self.usage.update(false, now);
                None
            }
        };

        self.last_analysis = analysis.clone();
        if !self.minimized {
            self.status.publish(self.snapshot(now).tray_status());
        }

        FrameOutcome { analysis, events }
    }

    fn track_proximity(&mut self, analysis: &GazeAnalysis, now: NaiveDateTime, events: &mut Vec<Event>) {
        let proximity = self.classifier.proximity();
        if !self.was_calibrated {
            if let Some(baseline_px) = proximity.calibration().baseline() {
                events.push(Event::DistanceCalibrated { baseline_px, at: now });
                self.was_calibrated = true;
            }
        }

        if analysis.too_close() && !self.was_too_close {
            events.push(Event::TooClose { at: now });
        }
        self.was_too_close = analysis.too_close();
    }

    fn check_blink_health(&mut self, analysis: &GazeAnalysis, now: NaiveDateTime, events: &mut Vec<Event>) {
        let rate = analysis.blink_rate();
        if rate <= 0.0 {
            return;
        }
        let issue = if rate < self.blink_config.low_rate_warning {
            BlinkRateIssue::Low
        } else if rate > self.blink_config.high_rate_warning {
            BlinkRateIssue::High
        } else {
            return;
        };

        let cooldown = Duration::seconds(self.blink_config.warning_cooldown_secs as i64);
        if self
            .last_health_warning
            .is_some_and(|last| now - last <= cooldown)
        {
            return;
        }

        self.last_health_warning = Some(now);
        self.last_warning = Some(issue.message().to_string());
        tracing::info!(rate, ?issue, "blink rate warning");
        events.push(Event::BlinkRateWarning {
            issue,
            rate,
            message: issue.message().to_string(),
            at: now,
        });
    }

    fn on_break_transition(
        &mut self,
        transition: Option<BreakEvent>,
        screen_time: Duration,
        now: NaiveDateTime,
        events: &mut Vec<Event>,
    ) {
        let (event, notification) = match transition {
            None => return,
            Some(BreakEvent::StartBreak) => {
                self.breaks_taken += 1;
                (
                    Event::BreakStarted {
                        screen_time_secs: screen_time.num_seconds(),
                        at: now,
                    },
                    Notification::break_started(self.notification_timeout),
                )
            }
            Some(BreakEvent::EndBreak) => (
                Event::BreakEnded { at: now },
                Notification::break_ended(self.notification_timeout),
            ),
        };

        if let Some(notifier) = &self.notifier {
            notify::dispatch(notifier.as_ref(), &notification);
        }
        events.push(event);
    }

    /// Apply an operator command.
    pub fn apply(&mut self, control: Control, now: NaiveDateTime) -> Event {
        match control {
            Control::Quit => self.quit_requested = true,
            Control::ResetBlinks => {
                self.classifier.reset_blink_counter();
                self.last_warning = None;
            }
            Control::ToggleDebug => self.debug = !self.debug,
            Control::ToggleCompact => self.compact = !self.compact,
            Control::ResetDistance => {
                self.classifier.reset_distance_calibration();
                self.was_calibrated = false;
                self.was_too_close = false;
            }
            // Rendering is up to the caller.
            Control::ShowHeatmap => {}
            Control::Minimize => {
                self.minimized = true;
                self.status.publish(TrayStatus::minimized());
            }
            Control::Restore => {
                self.minimized = false;
                self.status.publish(TrayStatus::running());
            }
        }
        tracing::debug!(%control, "control applied");
        Event::ControlApplied { control, at: now }
    }

    /// Presentation view of the current state.
    pub fn snapshot(&self, now: NaiveDateTime) -> OverlaySnapshot {
        let status = if self.breaks.is_on_break() {
            OverlayStatus::OnBreak
        } else {
            match &self.last_analysis {
                None => OverlayStatus::NoFace,
                Some(a) if a.too_close() => OverlayStatus::TooClose,
                Some(a) if a.is_looking_at_screen() => OverlayStatus::LookingAtScreen,
                Some(a) => OverlayStatus::Looking(a.direction()),
            }
        };

        let cooldown = Duration::seconds(self.blink_config.warning_cooldown_secs as i64);
        let warning = match (self.last_health_warning, &self.last_warning) {
            (Some(at), Some(text)) if now - at <= cooldown => Some(text.clone()),
            _ => None,
        };

        let debug = self.debug.then(|| DebugInfo {
            iris_positions: self.last_analysis.as_ref().and_then(|a| a.iris_positions()),
            iris_diameter: self.last_analysis.as_ref().and_then(|a| a.iris_diameter()),
            blink_count: self.classifier.blink_count(),
            distance_baseline: self.classifier.proximity().calibration().baseline(),
        });

        OverlaySnapshot {
            status,
            time_to_break_secs: self.breaks.time_to_break(now).num_seconds(),
            break_remaining_secs: self.breaks.break_remaining(now).map(|d| d.num_seconds()),
            blink_rate: self.classifier.blink_rate(now),
            screen_minutes: self.breaks.screen_time(now).num_minutes(),
            warning,
            compact: self.compact,
            debug,
        }
    }

    /// End the session, flushing usage. Consumes the session.
    pub fn finish(self, now: NaiveDateTime) -> SessionSummary {
        let total_blinks = self.classifier.blink_count();
        let average_blink_rate = self.classifier.blink_rate(now);
        let usage = self.usage.end_session(now);
        tracing::info!(session = %self.id, frames = self.frames, "tracking session finished");

        SessionSummary {
            session_id: self.id,
            started_at: self.started_at,
            ended_at: now,
            frames: self.frames,
            frames_with_face: self.frames_with_face,
            breaks_taken: self.breaks_taken,
            total_blinks,
            average_blink_rate,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::test_support::face;
    use crate::notify::NotifyError;
    use std::sync::{Arc, Mutex};

    const SIZE: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn at(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + Duration::seconds(secs)
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.timer.screen_time_limit_secs = 5;
        config.timer.break_duration_secs = 2;
        config
    }

    fn session() -> TrackingSession {
        TrackingSession::new(&config(), UsageAggregator::in_memory(at(0)), at(0))
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Notifier for Recorder {
        fn notify(&self, n: &Notification) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(n.title.clone());
            Ok(())
        }
    }

    #[test]
    fn break_cycle_notifies_once_each_way() {
        let recorder = Recorder::default();
        let mut session = session().with_notifier(Box::new(recorder.clone()));
        let centered = face().build();

        let mut events = Vec::new();
        for s in 0..=8 {
            events.extend(session.handle_frame(Some(&centered), SIZE, at(s)).events);
        }

        let starts = events.iter().filter(|e| matches!(e, Event::BreakStarted { .. })).count();
        let ends = events.iter().filter(|e| matches!(e, Event::BreakEnded { .. })).count();
        assert_eq!((starts, ends), (1, 1));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["20-20-20 Rule", "Break Over"]);
    }

    #[test]
    fn face_loss_and_return_are_reported() {
        let mut session = session();
        let first = session.handle_frame(Some(&face().build()), SIZE, at(0));
        assert!(matches!(first.events[0], Event::FaceFound { .. }));

        let lost = session.handle_frame(None, SIZE, at(1));
        assert!(lost.analysis.is_none());
        assert!(matches!(lost.events[0], Event::FaceLost { .. }));
        assert_eq!(session.snapshot(at(1)).status, OverlayStatus::NoFace);
        assert!(session.breaks().state().screen_watch_start.is_none());
    }

    #[test]
    fn break_ends_without_a_face() {
        let mut session = session();
        for s in 0..=5 {
            session.handle_frame(Some(&face().build()), SIZE, at(s));
        }
        assert!(session.breaks().is_on_break());
        let outcome = session.handle_frame(None, SIZE, at(7));
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::BreakEnded { .. })));
    }

    #[test]
    fn controls_toggle_presentation() {
        let mut session = session();
        let debug = session.is_debug();
        session.apply(Control::ToggleDebug, at(0));
        session.apply(Control::ToggleCompact, at(0));
        assert_eq!(session.is_debug(), !debug);
        assert!(session.is_compact());

        session.apply(Control::Minimize, at(0));
        assert!(session.status_board().current().minimized);
        session.apply(Control::Restore, at(0));
        assert_eq!(session.status_board().current(), TrayStatus::running());

        assert!(!session.should_quit());
        let event = session.apply(Control::Quit, at(0));
        assert!(session.should_quit());
        assert_eq!(
            event,
            Event::ControlApplied {
                control: Control::Quit,
                at: at(0)
            }
        );
    }

    #[test]
    fn status_board_follows_frames() {
        let mut session = session();
        let board = session.status_board();
        session.handle_frame(Some(&face().iris_at(0.05).build()), SIZE, at(0));
        assert_eq!(board.current().text, "Looking Left");
    }

    #[test]
    fn distance_calibration_event_fires_once() {
        let mut session = session();
        let mut calibrated = 0;
        for s in 0..40 {
            calibrated += session
                .handle_frame(Some(&face().build()), SIZE, at(0) + Duration::milliseconds(s * 33))
                .events
                .iter()
                .filter(|e| matches!(e, Event::DistanceCalibrated { .. }))
                .count();
        }
        assert_eq!(calibrated, 1);
    }

    #[test]
    fn finish_reports_totals() {
        let mut session = session();
        for s in 0..=3 {
            session.handle_frame(Some(&face().build()), SIZE, at(s * 60));
        }
        session.handle_frame(None, SIZE, at(200));
        let summary = session.finish(at(240));
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.frames_with_face, 4);
        assert_eq!(summary.breaks_taken, 1);
        assert!((summary.usage.watched_minutes - 3.0).abs() < 1e-9);
    }
}
