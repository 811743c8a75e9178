//! Hour-of-day heatmap and weekly totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Width of the longest bar in [`HourlyHeatmap::render_ascii`].
const BAR_WIDTH: f64 = 30.0;

/// Minutes watched per hour (0-23) for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyHeatmap {
    pub date: NaiveDate,
    pub minutes: [f64; 24],
}

impl HourlyHeatmap {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            minutes: [0.0; 24],
        }
    }

    pub fn minutes_at(&self, hour: u8) -> f64 {
        self.minutes.get(hour as usize).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.minutes.iter().sum()
    }

    /// Up to `n` hours with non-zero minutes, busiest first.
    ///
    /// Ties keep the earlier hour first.
    pub fn peak_hours(&self, n: usize) -> Vec<(u8, f64)> {
        let mut hours: Vec<(u8, f64)> = (0u8..24)
            .map(|h| (h, self.minutes[h as usize]))
            .filter(|(_, m)| *m > 0.0)
            .collect();
        hours.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        hours.truncate(n);
        hours
    }

    /// 24-row bar chart, bars scaled so the busiest hour spans 30 cells.
    pub fn render_ascii(&self) -> String {
        let max = self.minutes.iter().copied().fold(0.0_f64, f64::max).max(1.0);

        let mut out = String::new();
        let _ = writeln!(out, "Screen time heatmap for {}", self.date);
        let _ = writeln!(out, "{}", "=".repeat(50));
        for (hour, mins) in self.minutes.iter().enumerate() {
            let bar_len = ((mins / max) * BAR_WIDTH) as usize;
            let _ = writeln!(out, "{hour:02}:00 | {} {mins:.0}m", "█".repeat(bar_len));
        }
        out
    }
}

/// Total for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub minutes: f64,
}

/// Totals for today and the six days before it, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub days: Vec<DayTotal>,
}

impl WeeklySummary {
    pub fn total(&self) -> f64 {
        self.days.iter().map(|d| d.minutes).sum()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.days.iter().find(|d| d.date == date).map(|d| d.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heatmap() -> HourlyHeatmap {
        let mut map = HourlyHeatmap::empty(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        map.minutes[9] = 30.0;
        map.minutes[10] = 60.0;
        map.minutes[14] = 30.0;
        map.minutes[15] = 5.0;
        map
    }

    #[test]
    fn peak_hours_are_sorted_and_non_zero() {
        assert_eq!(heatmap().peak_hours(3), vec![(10, 60.0), (9, 30.0), (14, 30.0)]);
        let empty = HourlyHeatmap::empty(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert!(empty.peak_hours(3).is_empty());
    }

    #[test]
    fn ascii_scales_to_busiest_hour() {
        let text = heatmap().render_ascii();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 26);
        assert_eq!(lines[2], "00:00 |  0m");
        assert_eq!(lines[12], format!("10:00 | {} 60m", "█".repeat(30)));
        assert_eq!(lines[11], format!("09:00 | {} 30m", "█".repeat(15)));
    }

    #[test]
    fn total_sums_hours() {
        assert_eq!(heatmap().total(), 125.0);
        assert_eq!(heatmap().minutes_at(10), 60.0);
        assert_eq!(heatmap().minutes_at(99), 0.0);
    }
}
