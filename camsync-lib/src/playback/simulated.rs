//! In-memory video element driven by a wall clock.
//!
//! Position is tracked the way a stopwatch is: an anchor position plus the
//! wall time elapsed since the anchor, scaled by rate and by a decode skew that
//! models a player running slightly fast or slow.

use std::time::Duration;

use rand::Rng;

use crate::time::{SystemWallClock, Timestamp, WallClock};

use super::element::MediaElement;

#[derive(Debug, Clone)]
pub struct SimulatedElement<C: WallClock = SystemWallClock> {
    clock: C,
    ready: bool,
    paused: bool,
    rate: f64,
    skew: f64,
    anchor_position: Timestamp,
    anchor_wall: Timestamp,
    seeks: u64,
    released: bool,
}

impl<C: WallClock> SimulatedElement<C> {
    /// A ready, paused element at `position`, running at exactly real time.
    pub fn new(clock: C, position: Timestamp) -> Self {
        let now = clock.now();
        Self {
            clock,
            ready: true,
            paused: true,
            rate: 1.0,
            skew: 1.0,
            anchor_position: position,
            anchor_wall: now,
            seeks: 0,
            released: false,
        }
    }

    /// Run `skew` times faster than real time (e.g. `1.001` gains 1 ms/s).
    pub fn with_skew(mut self, skew: f64) -> Self {
        self.skew = if skew.is_finite() && skew > 0.0 { skew } else { 1.0 };
        self
    }

    /// Pick a skew uniformly within `±max_ppm` parts per million.
    pub fn with_random_skew<R: Rng + ?Sized>(self, max_ppm: f64, rng: &mut R) -> Self {
        if max_ppm <= 0.0 {
            return self;
        }
        let ppm = rng.gen_range(-max_ppm..=max_ppm);
        self.with_skew(1.0 + ppm / 1_000_000.0)
    }

    pub fn skew(&self) -> f64 {
        self.skew
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Lose `by` of progress, as a decode stall would.
    pub fn stall(&mut self, by: Duration) {
        self.reanchor();
        self.anchor_position = self.anchor_position - by;
    }

    pub fn seek_count(&self) -> u64 {
        self.seeks
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn position_at(&self, now: Timestamp) -> Timestamp {
        if self.paused {
            return self.anchor_position;
        }
        let wall_elapsed = (now.as_nanos() - self.anchor_wall.as_nanos()) as f64;
        let media_elapsed = (wall_elapsed * self.rate * self.skew).round() as i64;
        self.anchor_position.offset_nanos(media_elapsed)
    }

    fn reanchor(&mut self) {
        let now = self.clock.now();
        self.anchor_position = self.position_at(now);
        self.anchor_wall = now;
    }
}

impl<C: WallClock> MediaElement for SimulatedElement<C> {
    fn is_ready(&self) -> bool {
        self.ready && !self.released
    }

    fn play(&mut self) {
        self.reanchor();
        self.paused = false;
    }

    fn pause(&mut self) {
        self.reanchor();
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if rate == self.rate {
            return;
        }
        self.reanchor();
        self.rate = rate;
    }

    fn current_time(&self) -> Option<Timestamp> {
        Some(self.position_at(self.clock.now()))
    }

    fn set_current_time(&mut self, time: Timestamp) {
        self.anchor_position = time;
        self.anchor_wall = self.clock.now();
        self.seeks += 1;
    }

    fn release(&mut self) {
        self.released = true;
    }
}
