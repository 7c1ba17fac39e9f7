//! Print the thumbnail request set for one scrub state.

use camsync_lib::settings::SyncSettings;
use camsync_lib::thumbnails::{
    FetchReconciler, PrefetchPhase, ThumbnailPrefetchScheduler, ThumbnailPriority, TimeRange,
    VisibleWindow,
};
use camsync_lib::time::Timestamp;
use clap::ArgMatches;
use serde::Serialize;

use super::{value, CliError};

#[derive(Debug, Serialize)]
struct RequestLine {
    timestamp: Timestamp,
    seconds: f64,
    priority: ThumbnailPriority,
}

#[derive(Debug, Serialize)]
struct RequestSet {
    phase: PrefetchPhase,
    range: TimeRange,
    window: VisibleWindow,
    playhead: Timestamp,
    requests: Vec<RequestLine>,
}

/// Parse `START:END` ratios.
fn parse_window(text: &str) -> Result<VisibleWindow, CliError> {
    let invalid = || CliError::InvalidArgument(format!("window '{}' is not START:END", text));
    let (start, end) = text.split_once(':').ok_or_else(invalid)?;
    let start = start.trim().parse::<f64>().map_err(|_| invalid())?;
    let end = end.trim().parse::<f64>().map_err(|_| invalid())?;
    Ok(VisibleWindow::new(start, end))
}

pub fn run_thumbnails(args: &ArgMatches, settings: &SyncSettings) -> Result<i32, CliError> {
    let range = TimeRange::new(
        Timestamp::from_secs_f64(value(args, "range-start")?),
        Timestamp::from_secs_f64(value(args, "range-end")?),
    );
    let playhead = args
        .get_one::<f64>("playhead")
        .map(|secs| Timestamp::from_secs_f64(*secs))
        .unwrap_or_else(|| range.at_ratio(0.5));
    let window = parse_window(&value::<String>(args, "window")?)?;

    let mut scheduler = ThumbnailPrefetchScheduler::new(range, settings);
    let mut reconciler = FetchReconciler::new();
    let mut desired = scheduler.recompute(VisibleWindow::FULL, playhead, true);
    if args.get_flag("initial-satisfied") {
        // Pretend the first-paint batch loaded before the window moved.
        for request in reconciler.reconcile(&desired).start {
            reconciler.complete_for(&mut scheduler, request.timestamp);
        }
        desired = scheduler.recompute(window, playhead, true);
    } else if window != VisibleWindow::FULL {
        desired = scheduler.recompute(window, playhead, true);
    }

    let set = RequestSet {
        phase: scheduler.phase(),
        range,
        window,
        playhead,
        requests: desired
            .iter()
            .map(|request| RequestLine {
                timestamp: request.timestamp,
                seconds: request.timestamp.as_secs_f64(),
                priority: request.priority,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&set)?);
    Ok(0)
}
