use std::{
    io,
    sync::{Arc, Mutex, MutexGuard},
    thread::sleep,
    time::{Duration, Instant},
};

use camsync_lib::clock::{MediaClockEstimator, MediaClockSample};
use camsync_lib::diagnostics::Reporter;
use camsync_lib::playback::{
    sync_target, DriftDecision, GroupReport, PlaybackController, SimulatedElement, SyncGroup,
    SyncedPlayer,
};
use camsync_lib::settings::SyncSettings;
use camsync_lib::thumbnails::{
    FetchReconciler, PrefetchPhase, ThumbnailPrefetchScheduler, TimeRange, VisibleWindow,
    VisibleWindowDebouncer,
};
use camsync_lib::time::{SystemWallClock, Timestamp, WallClock};
use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::cli::{self, CliError};
use crate::logging::{self, LogBuffer};
use crate::{controls, ui};

type WallGroup = SyncGroup<SimulatedElement>;

const FRAME_INTERVAL: Duration = Duration::from_millis(50);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const SEEK_STEP: Duration = Duration::from_secs(5);
const STALL: Duration = Duration::from_millis(500);
const PAN_STEP: f64 = 0.05;
const RATE_STEP: f64 = 0.25;
const RATE_RANGE: (f64, f64) = (0.25, 4.0);
const SCRUB_HISTORY: Duration = Duration::from_secs(3_600);
// Live feeds start a few seconds before the 32-bit counter wraps.
const RTP_WRAP_LEAD_SECS: u32 = 5;

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32, CliError> {
    info!("starting camsync");
    match args.subcommand() {
        Some(("create", sub)) => cli::create::run_create(sub),
        Some(("simulate", sub)) => {
            let settings = cli::load_settings(sub)?;
            cli::simulate::run_simulate(sub, &settings)
        }
        Some(("rtp", sub)) => {
            let settings = cli::load_settings(sub)?;
            cli::rtp::run_rtp(sub, &settings)
        }
        Some(("thumbnails", sub)) => {
            let settings = cli::load_settings(sub)?;
            cli::thumbnails::run_thumbnails(sub, &settings)
        }
        Some(("wall", sub)) => {
            let settings = cli::load_settings(sub)?;
            run_wall(sub, &settings, log_buffer)
        }
        _ => Err(CliError::InvalidArgument("no subcommand given".to_string())),
    }
}

fn lock(group: &Arc<Mutex<WallGroup>>) -> Result<MutexGuard<'_, WallGroup>, CliError> {
    group.lock().map_err(|_| {
        CliError::Io(io::Error::new(
            io::ErrorKind::Other,
            "player group lock poisoned",
        ))
    })
}

struct LiveFeed {
    index: usize,
    start_ticks: u32,
}

/// Everything the dashboard drives: a player group on the system clock plus
/// the scrub overlay pipeline.
pub struct WallState {
    group: Arc<Mutex<WallGroup>>,
    settings: SyncSettings,
    target: Timestamp,
    live_feeds: Vec<LiveFeed>,
    started: Instant,
    last_frame: Instant,
    rng: StdRng,
    window: VisibleWindow,
    scrubbing: bool,
    debouncer: VisibleWindowDebouncer,
    scheduler: ThumbnailPrefetchScheduler,
    reconciler: FetchReconciler,
    seeks: u64,
}

impl WallState {
    fn new(args: &ArgMatches, settings: &SyncSettings) -> Result<Self, CliError> {
        let clip_players: usize = cli::value(args, "players")?;
        let live_players: usize = cli::value(args, "live")?;
        let max_skew_ppm: f64 = cli::value(args, "max-skew-ppm")?;
        let mut rng = match args.get_one::<u64>("seed") {
            Some(seed) => StdRng::seed_from_u64(*seed),
            None => StdRng::from_entropy(),
        };

        let clock = SystemWallClock;
        let target = clock.now() - settings.live_offset();
        let (writer, _) = sync_target();
        let mut group = SyncGroup::new(writer);
        group.set_target(target);

        for i in 0..clip_players {
            let estimator = MediaClockEstimator::with_clock(clock, settings);
            let mut controller = PlaybackController::new(estimator, false);
            let element =
                SimulatedElement::new(clock, target).with_random_skew(max_skew_ppm, &mut rng);
            info!("clip player {} skew {:.6}", i, element.skew());
            controller.attach(element);
            group.add_player(SyncedPlayer::new(controller, settings));
        }

        let wrap_lead = RTP_WRAP_LEAD_SECS.saturating_mul(settings.clock_hz);
        let mut live_feeds = Vec::with_capacity(live_players);
        for _ in 0..live_players {
            let estimator = MediaClockEstimator::with_clock(clock, settings);
            let mut controller = PlaybackController::new(estimator, true);
            controller.attach(SimulatedElement::new(clock, target));
            let index = group.add_player(SyncedPlayer::new(controller, settings));
            let start_ticks = u32::MAX - rng.gen_range(0..=wrap_lead);
            info!("live player {} starts at raw ticks {}", index, start_ticks);
            live_feeds.push(LiveFeed { index, start_ticks });
        }
        group.set_playing(true);

        let range = TimeRange::new(target - SCRUB_HISTORY, target);
        let now = Instant::now();
        Ok(Self {
            group: Arc::new(Mutex::new(group)),
            settings: settings.clone(),
            target,
            live_feeds,
            started: now,
            last_frame: now,
            rng,
            window: VisibleWindow::FULL,
            scrubbing: false,
            debouncer: VisibleWindowDebouncer::from_settings(settings),
            scheduler: ThumbnailPrefetchScheduler::new(range, settings),
            reconciler: FetchReconciler::new(),
            seeks: 0,
        })
    }

    /// Advance the target, feed live clocks and push options to every player.
    fn step(&mut self) -> Result<(), CliError> {
        let now = Instant::now();
        let frame = now.duration_since(self.last_frame);
        self.last_frame = now;
        let elapsed = now.duration_since(self.started);
        let clock_hz = self.settings.clock_hz;

        let mut group = lock(&self.group)?;
        if group.is_playing() {
            let advance = frame.as_nanos() as f64 * group.playback_rate();
            self.target = self.target.offset_nanos(advance.round() as i64);
        }
        group.set_target(self.target);

        let elapsed_ticks = (elapsed.as_secs_f64() * clock_hz as f64).round() as u64;
        for feed in &self.live_feeds {
            let raw = feed.start_ticks.wrapping_add(elapsed_ticks as u32);
            if let Some(player) = group.players_mut().get_mut(feed.index) {
                player
                    .controller_mut()
                    .on_frame(Some(MediaClockSample::new(raw, clock_hz)));
            }
        }

        for (index, decision) in group.tick().into_iter().enumerate() {
            if let DriftDecision::Seek(to) = decision {
                self.seeks += 1;
                debug!("player {} resynced to {}", index, to);
            }
        }
        drop(group);

        if let Some(window) = self.debouncer.poll(now) {
            self.refresh_thumbnails(window);
        }
        Ok(())
    }

    fn refresh_thumbnails(&mut self, window: VisibleWindow) {
        let playhead = self.playhead();
        loop {
            let plan =
                self.reconciler
                    .refresh(&mut self.scheduler, window, playhead, self.scrubbing);
            // Fetches complete instantly in the simulation.
            let mut first_paint_done = false;
            for request in plan.start {
                first_paint_done |= self
                    .reconciler
                    .complete_for(&mut self.scheduler, request.timestamp);
            }
            if !first_paint_done {
                break;
            }
        }
    }

    fn playhead(&self) -> Timestamp {
        let range = self.scheduler.range();
        self.target.clamp(range.start, range.end)
    }

    pub fn toggle_play(&mut self) -> Result<(), CliError> {
        let mut group = lock(&self.group)?;
        let playing = !group.is_playing();
        group.set_playing(playing);
        info!("group {}", if playing { "playing" } else { "paused" });
        Ok(())
    }

    pub fn seek_by(&mut self, forward: bool) {
        self.target = if forward {
            self.target + SEEK_STEP
        } else {
            self.target - SEEK_STEP
        };
        info!("target moved to {}", self.target);
    }

    pub fn nudge_rate(&mut self, faster: bool) -> Result<(), CliError> {
        let mut group = lock(&self.group)?;
        let step = if faster { RATE_STEP } else { -RATE_STEP };
        let rate = (group.playback_rate() + step).clamp(RATE_RANGE.0, RATE_RANGE.1);
        group.set_playback_rate(rate);
        info!("group rate {:.2}x", rate);
        Ok(())
    }

    /// Stall one random clip player to provoke a corrective seek.
    pub fn stall_random_player(&mut self) -> Result<(), CliError> {
        let mut group = lock(&self.group)?;
        let clips: Vec<usize> = group
            .players()
            .iter()
            .enumerate()
            .filter(|(_, player)| !player.controller().is_live())
            .map(|(index, _)| index)
            .collect();
        if clips.is_empty() {
            warn!("no clip players to stall");
            return Ok(());
        }
        let index = clips[self.rng.gen_range(0..clips.len())];
        if let Some(element) = group.players_mut()[index].controller_mut().element_mut() {
            element.stall(STALL);
            info!("stalled player {} by {:?}", index, STALL);
        }
        Ok(())
    }

    pub fn pan_window(&mut self, right: bool) {
        let delta = if right { PAN_STEP } else { -PAN_STEP };
        self.window = self.window.panned(delta);
        if self.scrubbing {
            self.debouncer.submit(self.window, Instant::now());
        }
    }

    pub fn toggle_scrub(&mut self) {
        self.scrubbing = !self.scrubbing;
        if self.scrubbing {
            let span = if self.window == VisibleWindow::FULL {
                0.25
            } else {
                self.window.span()
            };
            self.window = VisibleWindow::new(1.0 - span, 1.0);
            self.debouncer.submit(self.window, Instant::now());
        } else {
            self.debouncer.cancel();
            let window = self.window;
            self.refresh_thumbnails(window);
            self.window = VisibleWindow::FULL;
        }
    }

    fn scrub_status(&self) -> controls::ScrubStatus {
        controls::ScrubStatus {
            active: self.scrubbing,
            window: self.window,
            phase: if self.scrubbing {
                self.scheduler.phase()
            } else {
                PrefetchPhase::Inactive
            },
            pending: self.debouncer.is_pending(),
            loaded: self.reconciler.completed_count(),
            in_flight: self.reconciler.in_flight_count(),
        }
    }

    fn report(&self) -> Result<GroupReport, CliError> {
        Ok(lock(&self.group)?.report())
    }
}

fn start_reporter(group: &Arc<Mutex<WallGroup>>) -> Reporter {
    let source = group.clone();
    let reporter = Reporter::new(
        Arc::new(move || match source.lock() {
            Ok(group) => group.report(),
            Err(_) => GroupReport {
                target: None,
                playing: false,
                playback_rate: 1.0,
                players: Vec::new(),
            },
        }),
        Arc::new(Mutex::new(|report: GroupReport| {
            info!(
                "{} players, worst drift {}, {} seeks",
                report.players.len(),
                report
                    .worst_drift_ms()
                    .map_or_else(|| "-".to_string(), |drift| format!("{:.1}ms", drift)),
                report.total_seeks()
            );
        })),
        REPORT_INTERVAL,
    );
    reporter.start();
    reporter
}

fn run_wall(
    args: &ArgMatches,
    settings: &SyncSettings,
    log_buffer: LogBuffer,
) -> Result<i32, CliError> {
    let mut wall = WallState::new(args, settings)?;
    let reporter = start_reporter(&wall.group);

    let _raw_mode = RawModeGuard::enable().ok();
    let mut terminal = {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, EnterAlternateScreen, cursor::Hide);
        let backend = CrosstermBackend::new(stdout);
        Terminal::new(backend)?
    };

    // UI / input loop.
    loop {
        wall.step()?;

        let report = wall.report()?;
        let log_lines = logging::snapshot(&log_buffer);
        let status = controls::status_text(&report, &wall.scrub_status(), wall.seeks);
        ui::draw_status(&mut terminal, &status, &log_lines);

        if !controls::handle_key_event(&mut wall)? {
            break;
        }

        sleep(FRAME_INTERVAL);
    }

    reporter.stop();

    // Restore the terminal state before exiting.
    let _ = terminal.show_cursor();
    let stdout = terminal.backend_mut();
    let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);

    Ok(0)
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
