//! Media clock estimation from wrapping 32-bit transport tick counters.
//!
//! The state machine lives in [`ClockState::reduce`], a pure function of the
//! previous state, one [`ClockEvent`] and the current wall-clock time.
//! [`MediaClockEstimator`] wraps it with a clock source and counters.
//!
//! Calibration is heuristic: the first sample is pinned to
//! `now - live_offset`, modelling typical live-edge latency. This is not a
//! precision timing protocol and multiple estimators agree only as well as
//! their wall clocks and latency assumptions do.
//!
//! Any backward step of the raw counter is treated as a 32-bit wraparound.
//! A reordered or duplicated packet is indistinguishable from a wrap and will
//! advance the estimate by almost a full counter period.

mod estimator;

use std::time::Duration;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::constants::RTP_VIDEO_CLOCK_HZ;
use crate::time::Timestamp;

pub use estimator::MediaClockEstimator;

const COUNTER_MODULUS: u64 = 1 << 32;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// One per-frame reading of the transport's media clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaClockSample {
    pub raw_ticks: u32,
    pub clock_hz: u32,
}

impl MediaClockSample {
    pub fn new(raw_ticks: u32, clock_hz: u32) -> Self {
        Self {
            raw_ticks,
            clock_hz,
        }
    }

    /// Sample on the standard 90 kHz RTP video clock.
    pub fn rtp_video(raw_ticks: u32) -> Self {
        Self::new(raw_ticks, RTP_VIDEO_CLOCK_HZ)
    }
}

/// Input to the clock reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Sample(MediaClockSample),
    /// The transport delivered a frame without any usable timestamp.
    TimestampUnavailable,
}

/// Calibration point of a tracking clock.
///
/// Time is kept as a base plus the total ticks seen since calibration so that
/// hours of per-frame updates accumulate no rounding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAnchor {
    base: Timestamp,
    elapsed_ticks: u64,
    clock_hz: u32,
    last_raw_ticks: u32,
}

impl ClockAnchor {
    fn calibrate(sample: MediaClockSample, now: Timestamp, live_offset: Duration) -> Self {
        Self {
            base: now - live_offset,
            elapsed_ticks: 0,
            clock_hz: sample.clock_hz,
            last_raw_ticks: sample.raw_ticks,
        }
    }

    pub fn estimated_time(&self) -> Timestamp {
        self.base
            .offset_nanos(ticks_to_nanos(self.elapsed_ticks, self.clock_hz))
    }

    pub fn last_raw_ticks(&self) -> u32 {
        self.last_raw_ticks
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn advance(mut self, sample: MediaClockSample) -> (Self, bool) {
        if sample.clock_hz != self.clock_hz {
            debug!(
                "media clock rate changed from {} to {} Hz",
                self.clock_hz, sample.clock_hz
            );
            self.base = self.estimated_time();
            self.elapsed_ticks = 0;
            self.clock_hz = sample.clock_hz;
        }

        let delta = tick_delta(self.last_raw_ticks, sample.raw_ticks);
        let wrapped = sample.raw_ticks < self.last_raw_ticks;
        if wrapped {
            trace!(
                "media clock wrapped: {} -> {} (+{} ticks)",
                self.last_raw_ticks,
                sample.raw_ticks,
                delta
            );
        }
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(delta);
        self.last_raw_ticks = sample.raw_ticks;
        (self, wrapped)
    }
}

/// What one media clock sample did to a [`ClockState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Zero clock rate. The state is unchanged.
    Rejected,
    Calibrated,
    Advanced { wrapped: bool },
}

/// Estimated media time of one live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    /// Nothing received yet.
    #[default]
    Invalid,
    /// Fallback after a frame without timestamp: pinned to the assumed live edge.
    Assumed { time: Timestamp },
    Tracking(ClockAnchor),
}

impl ClockState {
    pub fn estimated_time(&self) -> Option<Timestamp> {
        match self {
            Self::Invalid => None,
            Self::Assumed { time } => Some(*time),
            Self::Tracking(anchor) => Some(anchor.estimated_time()),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    pub fn last_raw_ticks(&self) -> Option<u32> {
        match self {
            Self::Tracking(anchor) => Some(anchor.last_raw_ticks),
            _ => None,
        }
    }

    /// Fold one event into the state.
    ///
    /// # Arguments
    ///
    /// * `event` - Sample or "no timestamp" signal from the transport.
    /// * `now` - Current wall-clock time, used only for (re)calibration.
    /// * `live_offset` - Assumed distance between `now` and the live edge.
    #[must_use]
    pub fn reduce(self, event: ClockEvent, now: Timestamp, live_offset: Duration) -> ClockState {
        match event {
            ClockEvent::TimestampUnavailable => Self::Assumed {
                time: now - live_offset,
            },
            ClockEvent::Sample(sample) => self.apply_sample(sample, now, live_offset).0,
        }
    }

    /// Fold one sample into the state and report its effect.
    #[must_use]
    pub fn apply_sample(
        self,
        sample: MediaClockSample,
        now: Timestamp,
        live_offset: Duration,
    ) -> (ClockState, SampleOutcome) {
        if sample.clock_hz == 0 {
            warn!(
                "ignoring media clock sample {} with zero clock rate",
                sample.raw_ticks
            );
            return (self, SampleOutcome::Rejected);
        }
        match self {
            Self::Tracking(anchor) => {
                let (anchor, wrapped) = anchor.advance(sample);
                (Self::Tracking(anchor), SampleOutcome::Advanced { wrapped })
            }
            Self::Invalid | Self::Assumed { .. } => {
                let anchor = ClockAnchor::calibrate(sample, now, live_offset);
                debug!(
                    "media clock calibrated at {} from raw ticks {}",
                    anchor.base, sample.raw_ticks
                );
                (Self::Tracking(anchor), SampleOutcome::Calibrated)
            }
        }
    }
}

/// Ticks elapsed from `last` to `current` on a counter that wraps at 2^32.
///
/// A smaller `current` is always read as a wraparound, never as a step back.
pub fn tick_delta(last: u32, current: u32) -> u64 {
    if current < last {
        (current as u64 + COUNTER_MODULUS) - last as u64
    } else {
        (current - last) as u64
    }
}

/// Convert a tick count to nanoseconds, rounding to nearest.
pub fn ticks_to_nanos(ticks: u64, clock_hz: u32) -> i64 {
    if clock_hz == 0 {
        return 0;
    }
    let hz = clock_hz as u128;
    let nanos = (ticks as u128 * NANOS_PER_SEC + hz / 2) / hz;
    i64::try_from(nanos).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSET: Duration = Duration::from_secs(2);

    fn now() -> Timestamp {
        Timestamp::from_secs(1_700_000_000)
    }

    fn feed(state: ClockState, raw_ticks: u32) -> ClockState {
        state.reduce(
            ClockEvent::Sample(MediaClockSample::rtp_video(raw_ticks)),
            now(),
            OFFSET,
        )
    }

    #[test]
    fn first_sample_calibrates_behind_now() {
        let state = feed(ClockState::Invalid, 12_345);
        assert_eq!(state.estimated_time(), Some(now() - OFFSET));
        assert_eq!(state.last_raw_ticks(), Some(12_345));
    }

    #[test]
    fn invalid_state_has_no_time() {
        assert_eq!(ClockState::default().estimated_time(), None);
        assert!(!ClockState::default().is_valid());
    }

    #[test]
    fn tick_delta_matches_wrapping_sub() {
        for (last, current) in [(0, 0), (10, 20), (u32::MAX, 0), (u32::MAX - 99, 50), (7, 3)] {
            assert_eq!(tick_delta(last, current), current.wrapping_sub(last) as u64);
        }
    }

    #[test]
    fn wraparound_advances_by_folded_delta() {
        let start = feed(ClockState::Invalid, u32::MAX - 99);
        let before = start.estimated_time().unwrap();
        let after = feed(start, 50).estimated_time().unwrap();
        let advanced = after.as_nanos() - before.as_nanos();
        let expected = 150.0 / 90_000.0 * 1e9;
        assert!(after > before);
        assert!((advanced as f64 - expected).abs() <= 1.0);
    }

    #[test]
    fn monotonic_samples_advance_by_delta_over_rate() {
        let mut state = feed(ClockState::Invalid, 1_000);
        let mut previous = state.estimated_time().unwrap();
        for raw in [4_000_u32, 7_000, 97_000, 187_000] {
            let last = state.last_raw_ticks().unwrap();
            state = feed(state, raw);
            let current = state.estimated_time().unwrap();
            let expected = (raw - last) as f64 / 90_000.0;
            assert!(current > previous);
            assert!(((current.as_nanos() - previous.as_nanos()) as f64 / 1e9 - expected).abs() < 1e-8);
            previous = current;
        }
    }

    #[test]
    fn long_sessions_do_not_accumulate_rounding() {
        let mut state = feed(ClockState::Invalid, 0);
        let mut raw = 0_u32;
        // 30 fps at 90 kHz is 3000 ticks per frame; one hour of frames.
        for _ in 0..(30 * 3600) {
            raw = raw.wrapping_add(3_000);
            state = feed(state, raw);
        }
        let elapsed = state.estimated_time().unwrap().as_nanos() - (now() - OFFSET).as_nanos();
        assert_eq!(elapsed, 3_600 * 1_000_000_000);
    }

    #[test]
    fn timestamp_unavailable_assumes_live() {
        let tracking = feed(feed(ClockState::Invalid, 0), 900_000);
        let later = now() + Duration::from_secs(30);
        let state = tracking.reduce(ClockEvent::TimestampUnavailable, later, OFFSET);
        assert_eq!(state, ClockState::Assumed { time: later - OFFSET });
        assert_eq!(state.last_raw_ticks(), None);
    }

    #[test]
    fn sample_after_fallback_recalibrates() {
        let fallback = ClockState::Invalid.reduce(ClockEvent::TimestampUnavailable, now(), OFFSET);
        let later = now() + Duration::from_secs(1);
        let state = fallback.reduce(
            ClockEvent::Sample(MediaClockSample::rtp_video(42)),
            later,
            OFFSET,
        );
        assert_eq!(state.estimated_time(), Some(later - OFFSET));
        assert_eq!(state.last_raw_ticks(), Some(42));
    }

    #[test]
    fn zero_rate_sample_is_ignored() {
        let state = feed(ClockState::Invalid, 100);
        let next = state.reduce(
            ClockEvent::Sample(MediaClockSample::new(500, 0)),
            now(),
            OFFSET,
        );
        assert_eq!(next, state);
        let cold = ClockState::Invalid.reduce(
            ClockEvent::Sample(MediaClockSample::new(500, 0)),
            now(),
            OFFSET,
        );
        assert_eq!(cold, ClockState::Invalid);
    }

    #[test]
    fn rate_change_keeps_elapsed_time() {
        let state = feed(feed(ClockState::Invalid, 0), 90_000);
        let before = state.estimated_time().unwrap();
        let next = state.reduce(
            ClockEvent::Sample(MediaClockSample::new(90_000 + 48_000, 48_000)),
            now(),
            OFFSET,
        );
        let after = next.estimated_time().unwrap();
        assert_eq!(after.as_nanos() - before.as_nanos(), 1_000_000_000);
    }

    #[test]
    fn sample_outcome_reports_wraps_once() {
        let (state, outcome) =
            ClockState::Invalid.apply_sample(MediaClockSample::rtp_video(u32::MAX - 10), now(), OFFSET);
        assert_eq!(outcome, SampleOutcome::Calibrated);
        let (state, outcome) = state.apply_sample(MediaClockSample::rtp_video(5), now(), OFFSET);
        assert_eq!(outcome, SampleOutcome::Advanced { wrapped: true });
        let (_, outcome) = state.apply_sample(MediaClockSample::new(1, 0), now(), OFFSET);
        assert_eq!(outcome, SampleOutcome::Rejected);
    }

    #[test]
    fn ticks_to_nanos_rounds_to_nearest() {
        assert_eq!(ticks_to_nanos(150, 90_000), 1_666_667);
        assert_eq!(ticks_to_nanos(90_000, 90_000), 1_000_000_000);
        assert_eq!(ticks_to_nanos(10, 0), 0);
    }
}
