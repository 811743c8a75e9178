use clap::Subcommand;
use lookalive_core::storage::resolve_in_data_dir;
use lookalive_core::{Config, UsageAggregator};

use super::local_now;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's screen time by hour
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Totals for the last 7 days
    Week {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// ASCII heatmap of today's screen time
    Heatmap,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let now = local_now();
    // Read-only: the aggregator is dropped without ending a session.
    let usage = UsageAggregator::open(resolve_in_data_dir(&config.storage.usage_file)?, now);
    let today = now.date();

    match action {
        StatsAction::Today { json } => {
            let heatmap = usage.today_heatmap(today);
            if json {
                println!("{}", serde_json::to_string_pretty(&heatmap)?);
            } else {
                println!("Total screen time today: {:.0} minutes", heatmap.total());
                let peaks = heatmap.peak_hours(3);
                if !peaks.is_empty() {
                    println!("Peak usage hours:");
                    for (hour, minutes) in peaks {
                        println!("   {hour:02}:00 - {minutes:.0} min");
                    }
                }
            }
        }
        StatsAction::Week { json } => {
            let week = usage.weekly_summary(today);
            if json {
                println!("{}", serde_json::to_string_pretty(&week)?);
            } else {
                for day in &week.days {
                    println!("{}  {:>5.0} min", day.date, day.minutes);
                }
                println!("Total: {:.0} min", week.total());
            }
        }
        StatsAction::Heatmap => {
            print!("{}", usage.today_heatmap(today).render_ascii());
        }
    }
    Ok(())
}
