//! A wall of players following one coordinator.

use serde::Serialize;

use crate::time::{SystemWallClock, Timestamp, WallClock};

use super::drift::{drift_ms, DriftDecision};
use super::element::MediaElement;
use super::sync::{DriftStats, PlaybackOptions, SyncTargetReader, SyncTargetWriter, SyncedPlayer};

/// Per-player line of a [`GroupReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerReport {
    pub index: usize,
    pub live: bool,
    pub ready: bool,
    pub playing: bool,
    pub position: Option<Timestamp>,
    pub drift_ms: Option<f64>,
    pub stats: DriftStats,
}

/// Snapshot of a whole group for dashboards and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub target: Option<Timestamp>,
    pub playing: bool,
    pub playback_rate: f64,
    pub players: Vec<PlayerReport>,
}

impl GroupReport {
    pub fn total_seeks(&self) -> u64 {
        self.players.iter().map(|player| player.stats.seeks).sum()
    }

    /// Largest absolute drift among clip players right now.
    pub fn worst_drift_ms(&self) -> Option<f64> {
        self.players
            .iter()
            .filter(|player| !player.live)
            .filter_map(|player| player.drift_ms)
            .map(f64::abs)
            .reduce(f64::max)
    }
}

/// Coordinator of a synchronized wall.
///
/// Owns the single writer of the group's target and fans the current playback
/// options out to every member on [`tick`](Self::tick).
pub struct SyncGroup<E: MediaElement, C: WallClock = SystemWallClock> {
    target: SyncTargetWriter,
    players: Vec<SyncedPlayer<E, C>>,
    is_playing: bool,
    playback_rate: f64,
}

impl<E: MediaElement, C: WallClock> SyncGroup<E, C> {
    pub fn new(target: SyncTargetWriter) -> Self {
        Self {
            target,
            players: Vec::new(),
            is_playing: false,
            playback_rate: 1.0,
        }
    }

    /// Add a player and return its index.
    pub fn add_player(&mut self, player: SyncedPlayer<E, C>) -> usize {
        self.players.push(player);
        self.players.len() - 1
    }

    /// Remove a player, releasing its element.
    pub fn remove_player(&mut self, index: usize) -> Option<SyncedPlayer<E, C>> {
        if index >= self.players.len() {
            return None;
        }
        let mut player = self.players.remove(index);
        player.controller_mut().detach();
        Some(player)
    }

    pub fn set_target(&self, target: Timestamp) {
        self.target.set(target);
    }

    pub fn target(&self) -> Option<Timestamp> {
        self.target.get()
    }

    pub fn target_reader(&self) -> SyncTargetReader {
        self.target.reader()
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_playback_rate(&mut self, playback_rate: f64) {
        self.playback_rate = playback_rate;
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn players(&self) -> &[SyncedPlayer<E, C>] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [SyncedPlayer<E, C>] {
        &mut self.players
    }

    /// Push current options to every player.
    ///
    /// Live players receive rate 1.0 regardless of the group rate.
    pub fn tick(&mut self) -> Vec<DriftDecision> {
        let sync_time = self.target.get();
        let is_playing = self.is_playing;
        let group_rate = self.playback_rate;
        self.players
            .iter_mut()
            .map(|player| {
                let is_live = player.controller().is_live();
                player.update(PlaybackOptions {
                    is_playing,
                    playback_rate: if is_live { 1.0 } else { group_rate },
                    sync_time,
                    is_live_stream: is_live,
                })
            })
            .collect()
    }

    pub fn report(&self) -> GroupReport {
        let target = self.target.get();
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(index, player)| {
                let controller = player.controller();
                let handle = controller.handle();
                let position = controller.current_time();
                let live = controller.is_live();
                PlayerReport {
                    index,
                    live,
                    ready: controller.is_ready(),
                    playing: handle.is_some_and(|handle| handle.is_playing),
                    position,
                    drift_ms: match (position, target) {
                        (Some(position), Some(target)) if !live => Some(drift_ms(position, target)),
                        _ => None,
                    },
                    stats: player.stats(),
                }
            })
            .collect();
        GroupReport {
            target,
            playing: self.is_playing,
            playback_rate: self.playback_rate,
            players,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::{MediaClockEstimator, MediaClockSample};
    use crate::playback::controller::PlaybackController;
    use crate::playback::simulated::SimulatedElement;
    use crate::playback::sync::sync_target;
    use crate::settings::SyncSettings;
    use crate::time::ManualClock;

    type Group = SyncGroup<SimulatedElement<ManualClock>, ManualClock>;

    fn group(clock: &ManualClock, offsets_ms: &[i64], live: &[bool]) -> Group {
        let settings = SyncSettings::default();
        let (writer, _) = sync_target();
        let mut group = SyncGroup::new(writer);
        group.set_target(Timestamp::from_secs(1_000));
        for (offset, is_live) in offsets_ms.iter().zip(live) {
            let estimator = MediaClockEstimator::with_clock(clock.clone(), &settings);
            let mut controller = PlaybackController::new(estimator, *is_live);
            controller.attach(SimulatedElement::new(
                clock.clone(),
                Timestamp::from_secs(1_000).offset_nanos(offset * 1_000_000),
            ));
            group.add_player(SyncedPlayer::new(controller, &settings));
        }
        group
    }

    #[test]
    fn tick_seeks_only_players_outside_dead_band() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut group = group(&clock, &[0, 40, 3_000], &[false, false, false]);
        group.set_playing(true);
        let decisions = group.tick();
        assert_eq!(decisions[0], DriftDecision::NoAction);
        assert_eq!(decisions[1], DriftDecision::NoAction);
        assert_eq!(decisions[2], DriftDecision::Seek(Timestamp::from_secs(1_000)));
        assert_eq!(group.report().total_seeks(), 1);
    }

    #[test]
    fn live_members_follow_their_own_clock() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut group = group(&clock, &[0, 0], &[false, true]);
        group.set_playback_rate(2.0);
        group.set_playing(true);
        group.players_mut()[1]
            .controller_mut()
            .on_frame(Some(MediaClockSample::rtp_video(0)));
        let decisions = group.tick();
        assert_eq!(decisions, vec![DriftDecision::NoAction, DriftDecision::NoAction]);
        let report = group.report();
        assert_eq!(report.players[1].drift_ms, None);
        assert!(report.players[1].live);
        let live_rate = group.players()[1].controller().handle().unwrap().current_playback_rate;
        assert_eq!(live_rate, 1.0);
    }

    #[test]
    fn skewed_player_is_pulled_back_after_drifting() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut group = group(&clock, &[0], &[false]);
        if let Some(element) = group.players_mut()[0].controller_mut().element_mut() {
            *element = element.clone().with_skew(1.01);
        }
        group.set_playing(true);
        group.tick();
        let mut target = Timestamp::from_secs(1_000);
        let mut seeks = 0;
        for _ in 0..200 {
            clock.advance(Duration::from_millis(100));
            target = target + Duration::from_millis(100);
            group.set_target(target);
            if matches!(group.tick()[0], DriftDecision::Seek(_)) {
                seeks += 1;
            }
            let drift = group.report().worst_drift_ms().unwrap();
            assert!(drift.abs() <= 100.0 + 1e-6);
        }
        assert!(seeks >= 1);
    }

    #[test]
    fn removed_player_is_released() {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        let mut group = group(&clock, &[0, 0], &[false, false]);
        let removed = group.remove_player(0).unwrap();
        assert!(!removed.controller().is_attached());
        assert_eq!(group.players().len(), 1);
        assert!(group.remove_player(5).is_none());
    }
}
