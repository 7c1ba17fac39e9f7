//! Headless drift simulation on a manual clock.

use std::time::Duration;

use camsync_lib::clock::{MediaClockEstimator, MediaClockSample};
use camsync_lib::playback::{
    sync_target, DriftDecision, GroupReport, PlaybackController, SimulatedElement, SyncGroup,
    SyncedPlayer,
};
use camsync_lib::settings::SyncSettings;
use camsync_lib::time::{ManualClock, Timestamp};
use clap::ArgMatches;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{value, CliError};

const SIM_START_SECS: i64 = 1_700_000_000;

type SimGroup = SyncGroup<SimulatedElement<ManualClock>, ManualClock>;

pub struct SimulationConfig {
    pub players: usize,
    pub duration: Duration,
    pub tick: Duration,
    pub max_skew_ppm: f64,
    pub start_offset_ms: i64,
    pub live: bool,
    pub seed: Option<u64>,
}

impl SimulationConfig {
    fn from_args(args: &ArgMatches) -> Result<Self, CliError> {
        let seconds: f64 = value(args, "seconds")?;
        let duration = Duration::try_from_secs_f64(seconds).map_err(|_| {
            CliError::InvalidArgument(format!(
                "--seconds must be a non-negative duration, got {}",
                seconds
            ))
        })?;
        let tick_ms: u64 = value(args, "tick-ms")?;
        if tick_ms == 0 {
            return Err(CliError::InvalidArgument(
                "--tick-ms must be positive".to_string(),
            ));
        }
        Ok(Self {
            players: value(args, "players")?,
            duration,
            tick: Duration::from_millis(tick_ms),
            max_skew_ppm: value(args, "max-skew-ppm")?,
            start_offset_ms: value(args, "start-offset-ms")?,
            live: args.get_flag("live"),
            seed: args.get_one::<u64>("seed").copied(),
        })
    }
}

/// Drive a group for the configured duration and return its final report.
pub fn simulate(config: &SimulationConfig, settings: &SyncSettings) -> GroupReport {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let clock = ManualClock::new(Timestamp::from_secs(SIM_START_SECS));
    let mut target = Timestamp::from_secs(SIM_START_SECS) - settings.live_offset();

    let (writer, _) = sync_target();
    let mut group: SimGroup = SyncGroup::new(writer);
    group.set_target(target);

    for i in 0..config.players {
        let estimator = MediaClockEstimator::with_clock(clock.clone(), settings);
        let mut controller = PlaybackController::new(estimator, false);
        let start = target.offset_nanos(
            (i as i64)
                .saturating_mul(config.start_offset_ms)
                .saturating_mul(1_000_000),
        );
        let element = SimulatedElement::new(clock.clone(), start)
            .with_random_skew(config.max_skew_ppm, &mut rng);
        debug!("player {} skew {:.6}", i, element.skew());
        controller.attach(element);
        group.add_player(SyncedPlayer::new(controller, settings));
    }

    let mut rtp_ticks: u32 = 0;
    let live_index = config.live.then(|| {
        let estimator = MediaClockEstimator::with_clock(clock.clone(), settings);
        let mut controller = PlaybackController::new(estimator, true);
        controller.attach(SimulatedElement::new(clock.clone(), target));
        controller.on_frame(Some(MediaClockSample::new(rtp_ticks, settings.clock_hz)));
        group.add_player(SyncedPlayer::new(controller, settings))
    });

    group.set_playing(true);
    group.tick();

    let tick_nanos = config.tick.as_nanos() as f64;
    let ticks_per_step = (config.tick.as_secs_f64() * settings.clock_hz as f64).round() as u32;
    let steps = (config.duration.as_nanos() as f64 / tick_nanos).ceil() as u64;
    let mut seeks = 0_u64;
    for _ in 0..steps {
        clock.advance(config.tick);
        target = target.offset_nanos((tick_nanos * group.playback_rate()).round() as i64);
        group.set_target(target);

        if let Some(index) = live_index {
            rtp_ticks = rtp_ticks.wrapping_add(ticks_per_step);
            group.players_mut()[index]
                .controller_mut()
                .on_frame(Some(MediaClockSample::new(rtp_ticks, settings.clock_hz)));
        }

        for (index, decision) in group.tick().into_iter().enumerate() {
            if let DriftDecision::Seek(to) = decision {
                seeks += 1;
                debug!("player {} resynced to {}", index, to);
            }
        }
    }

    info!(
        "simulated {} steps of {:?}: {} corrective seeks",
        steps, config.tick, seeks
    );
    group.report()
}

fn print_summary(report: &GroupReport) {
    println!(
        "target={} playing={} rate={:.2}",
        report
            .target
            .map_or_else(|| "-".to_string(), |target| target.to_string()),
        report.playing,
        report.playback_rate
    );
    for player in &report.players {
        println!(
            "player {:>2} {:<4} drift={:>9} seeks={:<3} max_drift={:.3}ms",
            player.index,
            if player.live { "live" } else { "clip" },
            player
                .drift_ms
                .map_or_else(|| "-".to_string(), |drift| format!("{:.3}ms", drift)),
            player.stats.seeks,
            player.stats.max_drift_ms
        );
    }
    println!("total seeks: {}", report.total_seeks());
}

pub fn run_simulate(args: &ArgMatches, settings: &SyncSettings) -> Result<i32, CliError> {
    let config = SimulationConfig::from_args(args)?;
    let report = simulate(&config, settings);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig {
            players: 3,
            duration: Duration::from_secs(30),
            tick: Duration::from_millis(100),
            max_skew_ppm: 0.0,
            start_offset_ms: 0,
            live: false,
            seed: Some(7),
        }
    }

    #[test]
    fn perfect_players_never_seek() {
        let report = simulate(&config(), &SyncSettings::default());
        assert_eq!(report.total_seeks(), 0);
        assert_eq!(report.worst_drift_ms(), Some(0.0));
    }

    #[test]
    fn skewed_players_stay_within_dead_band() {
        let config = SimulationConfig {
            max_skew_ppm: 20_000.0,
            ..config()
        };
        let report = simulate(&config, &SyncSettings::default());
        let worst = report.worst_drift_ms().unwrap();
        assert!(worst <= 100.0 + 1e-6, "worst drift {}", worst);
    }

    #[test]
    fn live_player_is_not_corrected() {
        let config = SimulationConfig {
            live: true,
            ..config()
        };
        let report = simulate(&config, &SyncSettings::default());
        let live = report.players.last().unwrap();
        assert!(live.live);
        assert_eq!(live.drift_ms, None);
        assert_eq!(live.stats.seeks, 0);
    }
}
