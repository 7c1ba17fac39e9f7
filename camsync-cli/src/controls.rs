use std::time::Duration;

use camsync_lib::playback::GroupReport;
use camsync_lib::thumbnails::{PrefetchPhase, VisibleWindow};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::cli::CliError;
use crate::runner::WallState;

pub struct StatusSnapshot {
    pub text: String,
}

/// Scrub overlay state shown under the player list.
pub struct ScrubStatus {
    pub active: bool,
    pub window: VisibleWindow,
    pub phase: PrefetchPhase,
    pub pending: bool,
    pub loaded: usize,
    pub in_flight: usize,
}

pub fn status_text(report: &GroupReport, scrub: &ScrubStatus, seeks: u64) -> StatusSnapshot {
    let state = if report.playing { "▶ Playing" } else { "⏸ Paused" };
    let target = report
        .target
        .map_or_else(|| "--:--:--".to_string(), |target| format_clock(target.as_millis()));
    let worst = report
        .worst_drift_ms()
        .map_or_else(|| "-".to_string(), |drift| format!("{:.1}ms", drift));

    let mut lines = vec![format!(
        "{}   target {}   rate {:.2}x   worst drift {}   seeks {}",
        state, target, report.playback_rate, worst, seeks
    )];

    for player in &report.players {
        let position = player
            .position
            .map_or_else(|| "--:--:--".to_string(), |position| format_clock(position.as_millis()));
        let drift = match (player.live, player.drift_ms) {
            (true, _) => "live".to_string(),
            (false, Some(drift)) => format!("{:+8.1}ms", drift),
            (false, None) => "-".to_string(),
        };
        lines.push(format!(
            "#{:<2} {} {:<12} {}{}",
            player.index,
            position,
            drift,
            if player.ready { "" } else { "not ready " },
            if player.playing { "" } else { "paused" },
        ));
    }

    let scrub_line = if scrub.active {
        format!(
            "Scrub: {:.2}..{:.2}  {:?}{}  loaded {}  in flight {}",
            scrub.window.start_ratio,
            scrub.window.end_ratio,
            scrub.phase,
            if scrub.pending { " (settling)" } else { "" },
            scrub.loaded,
            scrub.in_flight
        )
    } else {
        format!("Scrub: off  loaded {}", scrub.loaded)
    };
    lines.push(scrub_line);

    StatusSnapshot {
        text: lines.join("\n"),
    }
}

pub fn handle_key_event(wall: &mut WallState) -> Result<bool, CliError> {
    if event::poll(Duration::from_millis(100)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return Ok(true);
            }
            match key.code {
                KeyCode::Char('q') => return Ok(false),
                KeyCode::Char(' ') => wall.toggle_play()?,
                KeyCode::Left => wall.seek_by(false),
                KeyCode::Right => wall.seek_by(true),
                KeyCode::Char('-') => wall.nudge_rate(false)?,
                KeyCode::Char('=') | KeyCode::Char('+') => wall.nudge_rate(true)?,
                KeyCode::Char('j') | KeyCode::Char('J') => wall.stall_random_player()?,
                KeyCode::Char('t') | KeyCode::Char('T') => wall.toggle_scrub(),
                KeyCode::Char('a') => wall.pan_window(false),
                KeyCode::Char('d') => wall.pan_window(true),
                _ => {}
            }
        }
    }

    Ok(true)
}

/// Wall-clock time of day (UTC) for a Unix millisecond timestamp.
fn format_clock(unix_millis: i64) -> String {
    let seconds = unix_millis.div_euclid(1000);
    let millis = unix_millis.rem_euclid(1000);
    let of_day = seconds.rem_euclid(86_400);
    let hours = of_day / 3_600;
    let minutes = (of_day % 3_600) / 60;
    let seconds = of_day % 60;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
