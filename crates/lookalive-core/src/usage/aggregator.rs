//! Accumulates watched minutes per hour and flushes them to the ledger.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::heatmap::{DayTotal, HourlyHeatmap, WeeklySummary};
use super::ledger::{UsageLedger, MAX_MINUTES_PER_DAY};
use crate::storage::LoadOutcome;

/// Calendar hour a minute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HourSlot {
    pub date: NaiveDate,
    pub hour: u8,
}

impl HourSlot {
    pub fn of(at: NaiveDateTime) -> Self {
        Self {
            date: at.date(),
            hour: at.hour() as u8,
        }
    }
}

/// Summary produced once when the aggregator is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Wall-clock length of the session.
    pub session_minutes: f64,
    /// Minutes credited as watched during this session.
    pub watched_minutes: f64,
    pub total_today: f64,
    /// Up to three busiest hours of today, non-zero only.
    pub peak_hours: Vec<(u8, f64)>,
    pub heatmap: HourlyHeatmap,
}

/// Per-hour usage accumulator backed by a [`UsageLedger`].
///
/// Minutes since the previous `update` are credited to the hour active at
/// the time of the call, even when the gap spans an hour boundary.
#[derive(Debug)]
pub struct UsageAggregator {
    ledger: UsageLedger,
    path: Option<PathBuf>,
    load_outcome: LoadOutcome,
    current_slot: Option<HourSlot>,
    pending_minutes: f64,
    last_update: Option<NaiveDateTime>,
    session_start: NaiveDateTime,
    watched_minutes: f64,
}

impl UsageAggregator {
    /// Load the ledger at `path` and start a session at `now`.
    pub fn open(path: impl Into<PathBuf>, now: NaiveDateTime) -> Self {
        let path = path.into();
        let (ledger, outcome) = UsageLedger::load(&path);
        Self::with_ledger(ledger, Some(path), outcome, now)
    }

    /// Aggregator that never touches disk.
    pub fn in_memory(now: NaiveDateTime) -> Self {
        Self::with_ledger(UsageLedger::new(), None, LoadOutcome::Missing, now)
    }

    fn with_ledger(
        ledger: UsageLedger,
        path: Option<PathBuf>,
        load_outcome: LoadOutcome,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            ledger,
            path,
            load_outcome,
            current_slot: None,
            pending_minutes: 0.0,
            last_update: None,
            session_start: now,
            watched_minutes: 0.0,
        }
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// Minutes waiting in the current hour's accumulator.
    pub fn pending_minutes(&self) -> f64 {
        self.pending_minutes
    }

    pub fn watched_minutes(&self) -> f64 {
        self.watched_minutes
    }

    /// Record one sample.
    ///
    /// The first sample of a session only starts the clock.
    pub fn update(&mut self, is_looking: bool, now: NaiveDateTime) {
        let slot = HourSlot::of(now);
        if self.current_slot != Some(slot) {
            self.flush();
            self.current_slot = Some(slot);
        }

        if is_looking {
            if let Some(last) = self.last_update {
                let elapsed = now - last;
                if elapsed > Duration::zero() {
                    let minutes = elapsed.num_milliseconds() as f64 / 60_000.0;
                    self.pending_minutes += minutes;
                    self.watched_minutes += minutes;
                }
            }
        }

        self.last_update = Some(now);
    }

    /// Minutes per hour for `today`, ledger plus anything not yet flushed.
    pub fn today_heatmap(&self, today: NaiveDate) -> HourlyHeatmap {
        let mut map = HourlyHeatmap::empty(today);
        if let Some(day) = self.ledger.day(today) {
            for (hour, minutes) in day {
                map.minutes[*hour as usize] = *minutes;
            }
        }
        if let Some(slot) = self.current_slot.filter(|s| s.date == today) {
            map.minutes[slot.hour as usize] += self.pending_for(today);
        }
        map
    }

    /// Totals for `today` and the six days before it, newest first.
    pub fn weekly_summary(&self, today: NaiveDate) -> WeeklySummary {
        let days = (0..7)
            .map(|back| {
                let date = today - Duration::days(back);
                let mut minutes = self.ledger.day_total(date);
                if self.current_slot.is_some_and(|s| s.date == date) {
                    minutes += self.pending_for(date);
                }
                DayTotal { date, minutes }
            })
            .collect();
        WeeklySummary { days }
    }

    /// Pending minutes that still fit under the day cap for `date`.
    fn pending_for(&self, date: NaiveDate) -> f64 {
        let room = (MAX_MINUTES_PER_DAY - self.ledger.day_total(date)).max(0.0);
        self.pending_minutes.min(room)
    }

    /// Flush everything and report on the session.
    ///
    /// Consumes the aggregator, so it runs at most once.
    pub fn end_session(mut self, now: NaiveDateTime) -> SessionReport {
        self.flush();
        self.persist();

        let today = now.date();
        let heatmap = self.today_heatmap(today);
        let session_minutes =
            ((now - self.session_start).num_milliseconds() as f64 / 60_000.0).max(0.0);

        tracing::info!(
            session_minutes,
            watched = self.watched_minutes,
            "usage session ended"
        );

        SessionReport {
            session_minutes,
            watched_minutes: self.watched_minutes,
            total_today: heatmap.total(),
            peak_hours: heatmap.peak_hours(3),
            heatmap,
        }
    }

    /// Move the pending minutes into the ledger and write it out.
    fn flush(&mut self) {
        let minutes = std::mem::take(&mut self.pending_minutes);
        let Some(slot) = self.current_slot else {
            return;
        };
        if minutes <= 0.0 {
            return;
        }
        self.ledger.add(slot.date, slot.hour, minutes);
        tracing::info!(date = %slot.date, hour = slot.hour, minutes, "flushed hourly usage");
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = self.ledger.save(path) {
            tracing::warn!("failed to save usage ledger to {}: {e}", path.display());
        }
    }
}
