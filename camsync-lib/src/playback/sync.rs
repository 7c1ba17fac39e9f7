//! Group synchronization: shared target, options bundle and per-player glue.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::settings::SyncSettings;
use crate::time::{SystemWallClock, Timestamp, WallClock};

use super::controller::PlaybackController;
use super::drift::{drift_ms, DriftCorrector, DriftDecision};
use super::element::MediaElement;

const UNSET: i64 = i64::MIN;

/// Create the slot holding a group's agreed playhead.
///
/// There is exactly one writer. Readers are cheap to clone and may live on any
/// thread.
pub fn sync_target() -> (SyncTargetWriter, SyncTargetReader) {
    let slot = Arc::new(AtomicI64::new(UNSET));
    (
        SyncTargetWriter { slot: slot.clone() },
        SyncTargetReader { slot },
    )
}

#[derive(Debug)]
pub struct SyncTargetWriter {
    slot: Arc<AtomicI64>,
}

impl SyncTargetWriter {
    pub fn set(&self, target: Timestamp) {
        // The sentinel is unreachable for real timestamps; clamp just in case.
        let nanos = target.as_nanos().max(UNSET + 1);
        self.slot.store(nanos, Ordering::Release);
    }

    pub fn clear(&self) {
        self.slot.store(UNSET, Ordering::Release);
    }

    pub fn get(&self) -> Option<Timestamp> {
        load(&self.slot)
    }

    pub fn reader(&self) -> SyncTargetReader {
        SyncTargetReader {
            slot: self.slot.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncTargetReader {
    slot: Arc<AtomicI64>,
}

impl SyncTargetReader {
    pub fn get(&self) -> Option<Timestamp> {
        load(&self.slot)
    }
}

fn load(slot: &AtomicI64) -> Option<Timestamp> {
    match slot.load(Ordering::Acquire) {
        UNSET => None,
        nanos => Some(Timestamp::from_nanos(nanos)),
    }
}

/// Everything the coordinating UI tells a player on each change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackOptions {
    pub is_playing: bool,
    pub playback_rate: f64,
    pub sync_time: Option<Timestamp>,
    pub is_live_stream: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            is_playing: false,
            playback_rate: 1.0,
            sync_time: None,
            is_live_stream: false,
        }
    }
}

/// Running drift counters for one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DriftStats {
    pub evaluations: u64,
    pub seeks: u64,
    pub last_drift_ms: Option<f64>,
    pub max_drift_ms: f64,
}

impl DriftStats {
    fn record(&mut self, drift_ms: f64, decision: DriftDecision) {
        self.evaluations += 1;
        self.last_drift_ms = Some(drift_ms);
        self.max_drift_ms = self.max_drift_ms.max(drift_ms.abs());
        if matches!(decision, DriftDecision::Seek(_)) {
            self.seeks += 1;
        }
    }
}

/// A controller paired with its drift corrector.
///
/// [`update`](Self::update) is meant to be called whenever the coordinator's
/// options change. Identical options are skipped so repeated ticks do not
/// trigger redundant seeks.
pub struct SyncedPlayer<E: MediaElement, C: WallClock = SystemWallClock> {
    controller: PlaybackController<E, C>,
    corrector: DriftCorrector,
    last_applied: Option<PlaybackOptions>,
    stats: DriftStats,
}

impl<E: MediaElement, C: WallClock> SyncedPlayer<E, C> {
    pub fn new(controller: PlaybackController<E, C>, settings: &SyncSettings) -> Self {
        Self {
            controller,
            corrector: DriftCorrector::from_settings(settings),
            last_applied: None,
            stats: DriftStats::default(),
        }
    }

    /// Apply a new options bundle.
    ///
    /// Playback state is applied first and the drift decision second, so a
    /// seek is never undone by a play/pause toggle within the same tick. When
    /// the player is not ready nothing is applied or remembered; the next
    /// update tries again.
    ///
    /// # Returns
    ///
    /// The drift decision that was applied, `NoAction` when skipped.
    pub fn update(&mut self, options: PlaybackOptions) -> DriftDecision {
        if self.last_applied == Some(options) {
            return DriftDecision::NoAction;
        }
        if !self.controller.is_ready() {
            debug!("player not ready; options will be re-applied on next change");
            return DriftDecision::NoAction;
        }

        self.controller.set_live(options.is_live_stream);
        self.controller
            .apply_playback_state(options.is_playing, options.playback_rate);

        let decision = match (options.sync_time, self.controller.current_time()) {
            (Some(target), Some(position)) => {
                let decision = self
                    .corrector
                    .evaluate(position, target, options.is_live_stream);
                if !options.is_live_stream {
                    self.stats.record(drift_ms(position, target), decision);
                }
                decision
            }
            _ => DriftDecision::NoAction,
        };
        self.controller.apply_drift_decision(decision);

        self.last_applied = Some(options);
        decision
    }

    /// Forget the last applied options so the next update re-applies.
    pub fn invalidate(&mut self) {
        self.last_applied = None;
    }

    pub fn stats(&self) -> DriftStats {
        self.stats
    }

    pub fn controller(&self) -> &PlaybackController<E, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController<E, C> {
        &mut self.controller
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::MediaClockEstimator;
    use crate::playback::simulated::SimulatedElement;
    use crate::time::ManualClock;

    type Player = SyncedPlayer<SimulatedElement<ManualClock>, ManualClock>;

    fn player(clock: &ManualClock, position: Timestamp) -> Player {
        let settings = SyncSettings::default();
        let mut controller =
            PlaybackController::new(MediaClockEstimator::with_clock(clock.clone(), &settings), false);
        controller.attach(SimulatedElement::new(clock.clone(), position));
        SyncedPlayer::new(controller, &settings)
    }

    fn options(sync_ms: i64) -> PlaybackOptions {
        PlaybackOptions {
            is_playing: true,
            playback_rate: 1.0,
            sync_time: Some(Timestamp::from_millis(sync_ms)),
            is_live_stream: false,
        }
    }

    #[test]
    fn target_slot_starts_empty_and_is_shared() {
        let (writer, reader) = sync_target();
        assert_eq!(reader.get(), None);
        writer.set(Timestamp::from_secs(12));
        assert_eq!(reader.get(), Some(Timestamp::from_secs(12)));
        assert_eq!(writer.reader().get(), Some(Timestamp::from_secs(12)));
        writer.clear();
        assert_eq!(reader.clone().get(), None);
    }

    #[test]
    fn target_is_visible_across_threads() {
        let (writer, reader) = sync_target();
        writer.set(Timestamp::from_millis(42));
        let seen = std::thread::spawn(move || reader.get())
            .join()
            .expect("reader thread");
        assert_eq!(seen, Some(Timestamp::from_millis(42)));
    }

    #[test]
    fn small_drift_is_left_alone() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut player = player(&clock, Timestamp::from_millis(10_000));
        assert_eq!(player.update(options(10_050)), DriftDecision::NoAction);
        assert_eq!(player.stats().seeks, 0);
        assert_eq!(player.stats().last_drift_ms, Some(50.0));
    }

    #[test]
    fn large_drift_seeks_once() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut player = player(&clock, Timestamp::from_millis(10_000));
        let decision = player.update(options(12_000));
        assert_eq!(decision, DriftDecision::Seek(Timestamp::from_millis(12_000)));
        assert_eq!(
            player.controller().current_time(),
            Some(Timestamp::from_millis(12_000))
        );
        assert_eq!(player.update(options(12_000)), DriftDecision::NoAction);
        assert_eq!(player.stats().seeks, 1);
        assert_eq!(player.stats().evaluations, 1);
    }

    #[test]
    fn seek_survives_play_toggle_in_same_update() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut player = player(&clock, Timestamp::from_millis(0));
        player.update(options(5_000));
        let mut paused = options(9_000);
        paused.is_playing = false;
        player.update(paused);
        clock.advance(Duration::from_secs(3));
        assert_eq!(
            player.controller().current_time(),
            Some(Timestamp::from_millis(9_000))
        );
    }

    #[test]
    fn unready_player_reapplies_on_next_update() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut player = player(&clock, Timestamp::from_millis(0));
        if let Some(element) = player.controller_mut().element_mut() {
            element.set_ready(false);
        }
        assert_eq!(player.update(options(5_000)), DriftDecision::NoAction);
        if let Some(element) = player.controller_mut().element_mut() {
            element.set_ready(true);
        }
        assert_eq!(
            player.update(options(5_000)),
            DriftDecision::Seek(Timestamp::from_millis(5_000))
        );
    }

    #[test]
    fn live_players_skip_drift_stats() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut player = player(&clock, Timestamp::from_millis(0));
        let mut live = options(60_000);
        live.is_live_stream = true;
        player.controller_mut().on_frame(Some(crate::clock::MediaClockSample::rtp_video(0)));
        assert_eq!(player.update(live), DriftDecision::NoAction);
        assert_eq!(player.stats().evaluations, 0);
    }
}
