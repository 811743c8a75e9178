//! Screen usage accounting: hourly accumulation, the persisted ledger and
//! the heatmap/weekly views built from it.

mod aggregator;
mod heatmap;
mod ledger;

pub use aggregator::{HourSlot, SessionReport, UsageAggregator};
pub use heatmap::{DayTotal, HourlyHeatmap, WeeklySummary};
pub use ledger::{UsageLedger, MAX_MINUTES_PER_DAY};
