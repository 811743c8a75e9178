use clap::Subcommand;
use lookalive_core::calibration::SAMPLES_PER_POSITION;
use lookalive_core::storage::resolve_in_data_dir;
use lookalive_core::{
    CalibrationPosition, CaptureSource, Config, LandmarkSource, ReplaySource, ScreenCalibration,
};
use std::path::PathBuf;

use super::local_now;

#[derive(Subcommand)]
pub enum CalibrateAction {
    /// Build screen bounds from a labelled landmark stream
    Run {
        /// Stream whose frames carry a "label" of left/right/top/bottom/center
        #[arg(long)]
        replay: PathBuf,
    },
    /// Show the saved calibration
    Show,
}

pub fn run(action: CalibrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let path = resolve_in_data_dir(&config.storage.calibration_file)?;

    match action {
        CalibrateAction::Run { replay } => {
            let mut source = ReplaySource::open(&replay)?;
            let mut calibration = ScreenCalibration::new();

            while let Some(frame) = source.read()? {
                let Some(label) = frame.label.as_deref() else {
                    continue;
                };
                let position: CalibrationPosition = match label.parse() {
                    Ok(position) => position,
                    Err(e) => {
                        tracing::warn!("skipping frame: {e}");
                        continue;
                    }
                };
                let Some(landmarks) = source.process(&frame) else {
                    tracing::debug!(%position, "no face in calibration frame");
                    continue;
                };
                let now = frame.at.unwrap_or_else(local_now);
                calibration.collect_sample(&landmarks, frame.size, position, now);
            }

            for position in CalibrationPosition::ALL {
                let n = calibration.samples_for(position);
                if n > 0 && n < SAMPLES_PER_POSITION {
                    eprintln!(
                        "warning: only {n} samples for {position} ({SAMPLES_PER_POSITION} recommended)"
                    );
                }
            }

            let bounds = calibration.finalize()?;
            calibration.save(&path)?;
            println!("{}", serde_json::to_string_pretty(&bounds)?);
        }
        CalibrateAction::Show => {
            let (calibration, outcome) = ScreenCalibration::load(&path);
            let body = serde_json::json!({
                "path": path,
                "load": outcome,
                "is_calibrated": calibration.is_calibrated,
                "screen_bounds": calibration.screen_bounds,
                "samples": calibration.calibration_points.len(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}
