//! Persisted per-date, per-hour screen minutes.
//!
//! File format:
//!
//! ```json
//! { "daily": { "2026-03-02": { "9": 41.5, "10": 12.0 } } }
//! ```
//!
//! The whole document is rewritten on every save.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::storage::{load_json, LoadOutcome};

/// Minutes in a day; no date may hold more.
pub const MAX_MINUTES_PER_DAY: f64 = 1440.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLedger {
    #[serde(default)]
    daily: BTreeMap<NaiveDate, BTreeMap<u8, f64>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ledger at `path`.
    ///
    /// Missing and unreadable files both yield an empty ledger; the outcome
    /// says which.
    pub fn load(path: &Path) -> (Self, LoadOutcome) {
        let (ledger, outcome) = load_json::<UsageLedger>(path);
        let ledger = ledger.map(UsageLedger::sanitized).unwrap_or_default();
        outcome.log("usage ledger", path);
        (ledger, outcome)
    }

    /// Write the ledger as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Credit `minutes` to one hour, keeping the date under the daily cap.
    ///
    /// Returns the minutes actually credited.
    pub fn add(&mut self, date: NaiveDate, hour: u8, minutes: f64) -> f64 {
        if hour > 23 || !minutes.is_finite() || minutes <= 0.0 {
            return 0.0;
        }
        let day = self.daily.entry(date).or_default();
        let used: f64 = day.values().sum();
        let credited = minutes.min((MAX_MINUTES_PER_DAY - used).max(0.0));
        if credited > 0.0 {
            *day.entry(hour).or_insert(0.0) += credited;
        } else {
            tracing::warn!(%date, "daily minute cap reached, dropping {minutes:.2} min");
        }
        credited
    }

    pub fn day(&self, date: NaiveDate) -> Option<&BTreeMap<u8, f64>> {
        self.daily.get(&date)
    }

    pub fn minutes(&self, date: NaiveDate, hour: u8) -> f64 {
        self.daily
            .get(&date)
            .and_then(|day| day.get(&hour))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn day_total(&self, date: NaiveDate) -> f64 {
        self.daily
            .get(&date)
            .map(|day| day.values().sum())
            .unwrap_or(0.0)
    }

    /// Dates with any recorded minutes, oldest first.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.daily.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }

    // Hand-edited or older files may carry out-of-range hours or values.
    fn sanitized(self) -> Self {
        let mut clean = UsageLedger::default();
        for (date, hours) in self.daily {
            for (hour, minutes) in hours {
                if hour > 23 {
                    tracing::warn!(%date, hour, "ignoring out-of-range hour in usage ledger");
                    continue;
                }
                clean.add(date, hour, minutes);
            }
        }
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn add_accumulates_per_hour() {
        let mut ledger = UsageLedger::new();
        ledger.add(date(2), 9, 10.0);
        ledger.add(date(2), 9, 5.5);
        ledger.add(date(2), 10, 1.0);
        assert_eq!(ledger.minutes(date(2), 9), 15.5);
        assert_eq!(ledger.day_total(date(2)), 16.5);
        assert_eq!(ledger.minutes(date(3), 9), 0.0);
    }

    #[test]
    fn daily_total_is_capped() {
        let mut ledger = UsageLedger::new();
        assert_eq!(ledger.add(date(2), 1, 1000.0), 1000.0);
        assert_eq!(ledger.add(date(2), 2, 600.0), 440.0);
        assert_eq!(ledger.add(date(2), 3, 1.0), 0.0);
        assert_eq!(ledger.day_total(date(2)), MAX_MINUTES_PER_DAY);
        assert!(ledger.day(date(2)).unwrap().get(&3).is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let mut ledger = UsageLedger::new();
        assert_eq!(ledger.add(date(2), 24, 1.0), 0.0);
        assert_eq!(ledger.add(date(2), 1, -3.0), 0.0);
        assert_eq!(ledger.add(date(2), 1, f64::NAN), 0.0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn json_uses_string_keys() {
        let mut ledger = UsageLedger::new();
        ledger.add(date(2), 9, 2.0);
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["daily"]["2026-03-02"]["9"], 2.0);
    }

    #[test]
    fn load_drops_invalid_hours_and_caps_days() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session_data.json");
        std::fs::write(
            &path,
            r#"{"daily":{"2026-03-02":{"9":1000.0,"10":1000.0,"30":5.0}},"weekly_summary":{}}"#,
        )
        .unwrap();

        let (ledger, outcome) = UsageLedger::load(&path);
        assert!(outcome.is_loaded());
        assert_eq!(ledger.minutes(date(2), 9), 1000.0);
        assert_eq!(ledger.minutes(date(2), 10), 440.0);
        assert_eq!(ledger.day(date(2)).unwrap().len(), 2);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session_data.json");
        std::fs::write(&path, "{\"daily\": [1, 2").unwrap();

        let (ledger, outcome) = UsageLedger::load(&path);
        assert!(ledger.is_empty());
        assert!(matches!(outcome, LoadOutcome::Corrupt { .. }));
    }
}
