//! Replay raw RTP timestamps through a media clock estimator.

use std::io::{self, BufRead};

use camsync_lib::clock::{tick_delta, ClockState, MediaClockEstimator, MediaClockSample};
use camsync_lib::settings::SyncSettings;
use camsync_lib::time::{ManualClock, Timestamp, WallClock};
use clap::ArgMatches;

use super::CliError;

const FIXED_NOW_SECS: i64 = 1_700_000_000;

/// One input line: a raw timestamp, or `None` for a frame without one.
fn parse_ticks(token: &str) -> Result<Option<u32>, CliError> {
    let token = token.trim();
    if token == "-" {
        return Ok(None);
    }
    token
        .parse::<u32>()
        .map(Some)
        .map_err(|err| CliError::InvalidArgument(format!("'{}': {}", token, err)))
}

fn state_label(state: &ClockState) -> &'static str {
    match state {
        ClockState::Invalid => "invalid",
        ClockState::Assumed { .. } => "assumed",
        ClockState::Tracking(_) => "tracking",
    }
}

/// Format one replay line. Elapsed time is measured from the calibration
/// point, so the wall clock is held still for the whole replay.
fn describe(
    ticks: Option<u32>,
    delta: Option<u64>,
    state: &ClockState,
    origin: Timestamp,
) -> String {
    let ticks = ticks.map_or_else(|| "-".to_string(), |ticks| ticks.to_string());
    let delta = delta.map_or_else(|| "-".to_string(), |delta| delta.to_string());
    let elapsed = state
        .estimated_time()
        .map_or_else(
            || "-".to_string(),
            |time| format!("{:.6}", origin.millis_until(time) / 1_000.0),
        );
    format!(
        "ticks={} delta={} elapsed={} state={}",
        ticks,
        delta,
        elapsed,
        state_label(state)
    )
}

pub fn run_rtp(args: &ArgMatches, settings: &SyncSettings) -> Result<i32, CliError> {
    let clock_hz = args
        .get_one::<u32>("clock-hz")
        .copied()
        .unwrap_or(settings.clock_hz);

    let tokens: Vec<String> = match args.get_many::<String>("TICKS") {
        Some(values) => values.cloned().collect(),
        None => io::stdin()
            .lock()
            .lines()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect(),
    };

    let clock = ManualClock::new(Timestamp::from_secs(FIXED_NOW_SECS));
    let origin = clock.now() - settings.live_offset();
    let mut estimator = MediaClockEstimator::with_clock(clock, settings);

    for token in tokens {
        let ticks = parse_ticks(&token)?;
        let delta = match (estimator.state().last_raw_ticks(), ticks) {
            (Some(last), Some(current)) => Some(tick_delta(last, current)),
            _ => None,
        };
        estimator.on_frame(ticks.map(|raw| MediaClockSample::new(raw, clock_hz)));
        println!("{}", describe(ticks, delta, &estimator.state(), origin));
    }

    println!(
        "samples={} wraps={} fallbacks={}",
        estimator.sample_count(),
        estimator.wrap_count(),
        estimator.fallback_count()
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_missing_timestamp() {
        assert_eq!(parse_ticks(" - ").unwrap(), None);
        assert_eq!(parse_ticks("42").unwrap(), Some(42));
        assert!(parse_ticks("-5").is_err());
    }

    #[test]
    fn describe_reports_elapsed_from_origin() {
        let origin = Timestamp::from_secs(100);
        let state = ClockState::Assumed {
            time: Timestamp::from_millis(100_500),
        };
        assert_eq!(
            describe(None, None, &state, origin),
            "ticks=- delta=- elapsed=0.500000 state=assumed"
        );
        assert_eq!(
            describe(Some(1), None, &ClockState::Invalid, origin),
            "ticks=1 delta=- elapsed=- state=invalid"
        );
    }
}
