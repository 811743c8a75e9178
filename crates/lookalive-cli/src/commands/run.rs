use clap::Args;
use lookalive_core::usage::SessionReport;
use lookalive_core::{
    CaptureSource, Config, Control, ControlSource, CoreError, Event, Frame, LandmarkSource,
    ReplaySource, SessionSummary, TrackingSession,
};
use serde::Serialize;
use std::path::PathBuf;

use super::local_now;
use crate::indicator::Indicator;

#[derive(Args)]
pub struct RunArgs {
    /// Newline-delimited JSON landmark stream ("-" for stdin)
    #[arg(long)]
    replay: PathBuf,
    /// Override the screen-watch limit (seconds)
    #[arg(long)]
    screen_limit: Option<u64>,
    /// Override the break length (seconds)
    #[arg(long)]
    break_duration: Option<u64>,
    /// Draw the text overlay on stderr after every frame
    #[arg(long)]
    overlay: bool,
    /// Mirror the tray status into this file
    #[arg(long)]
    status_file: Option<PathBuf>,
    /// Do not send desktop notifications
    #[arg(long)]
    no_notify: bool,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Line<'a> {
    #[serde(rename = "SessionSummary")]
    Summary(&'a SessionSummary),
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(secs) = args.screen_limit {
        config.timer.screen_time_limit_secs = secs;
    }
    if let Some(secs) = args.break_duration {
        config.timer.break_duration_secs = secs;
    }
    if args.no_notify {
        config.notifications.enabled = false;
    }
    config.validate()?;

    let mut source = ReplaySource::open(&args.replay)?;
    // Replayed frames carry their own clock; the session starts at the first one.
    let first = source.read();
    let started_at = match &first {
        Ok(Some(frame)) => frame.at.unwrap_or_else(local_now),
        _ => local_now(),
    };
    let mut session = TrackingSession::from_config(&config, started_at)?;
    let indicator = args
        .status_file
        .map(|path| Indicator::spawn(session.status_board(), path));

    let mut last_now = None;
    let outcome =
        first.and_then(|first| track(&mut session, &mut source, first, args.overlay, &mut last_now));

    let summary = session.finish(last_now.unwrap_or_else(local_now));
    if let Some(indicator) = indicator {
        indicator.stop();
    }
    println!("{}", serde_json::to_string(&Line::Summary(&summary))?);
    print_report(&summary.usage);

    outcome?;
    Ok(())
}

fn track<S>(
    session: &mut TrackingSession,
    source: &mut S,
    first: Option<Frame>,
    overlay: bool,
    last_now: &mut Option<chrono::NaiveDateTime>,
) -> Result<(), CoreError>
where
    S: CaptureSource + LandmarkSource + ControlSource,
{
    let mut next = first;
    loop {
        if session.should_quit() {
            tracing::info!("quit requested");
            return Ok(());
        }
        let Some(frame) = next.take() else {
            break;
        };
        let now = frame.at.unwrap_or_else(local_now);
        *last_now = Some(now);

        let landmarks = source.process(&frame);
        let outcome = session.handle_frame(landmarks.as_ref(), frame.size, now);
        for event in &outcome.events {
            emit(event);
        }
        drain_controls(session, source, now);

        if overlay && !session.is_minimized() {
            eprint!("{}", session.snapshot(now).render());
        }
        next = source.read()?;
    }

    let now = last_now.unwrap_or_else(local_now);
    drain_controls(session, source, now);
    Ok(())
}

fn drain_controls<S: ControlSource>(
    session: &mut TrackingSession,
    source: &mut S,
    now: chrono::NaiveDateTime,
) {
    while let Some(control) = source.poll() {
        emit(&session.apply(control, now));
        if control == Control::ShowHeatmap {
            eprint!("{}", session.today_heatmap(now.date()).render_ascii());
        }
    }
}

fn emit(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!("failed to serialize event: {e}"),
    }
}

fn print_report(report: &SessionReport) {
    eprintln!("Session duration: {:.1} minutes", report.session_minutes);
    eprintln!("Total screen time today: {:.0} minutes", report.total_today);
    if !report.peak_hours.is_empty() {
        eprintln!("Peak usage hours:");
        for (hour, minutes) in &report.peak_hours {
            eprintln!("   {hour:02}:00 - {minutes:.0} min");
        }
    }
}
