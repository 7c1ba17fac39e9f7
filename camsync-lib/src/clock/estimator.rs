use std::time::Duration;

use crate::error::SyncError;
use crate::settings::SyncSettings;
use crate::time::{SystemWallClock, Timestamp, WallClock};

use super::{ClockEvent, ClockState, MediaClockSample, SampleOutcome};

/// Per-stream media clock estimator.
///
/// Owns one [`ClockState`] and threads every event through
/// [`ClockState::reduce`]. All operations are O(1) and never block, so they
/// are safe to call from a per-frame callback.
#[derive(Debug, Clone)]
pub struct MediaClockEstimator<C: WallClock = SystemWallClock> {
    state: ClockState,
    clock: C,
    live_offset: Duration,
    samples: u64,
    wraps: u64,
    fallbacks: u64,
}

impl MediaClockEstimator<SystemWallClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemWallClock, &SyncSettings::default())
    }
}

impl Default for MediaClockEstimator<SystemWallClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: WallClock> MediaClockEstimator<C> {
    pub fn with_clock(clock: C, settings: &SyncSettings) -> Self {
        Self {
            state: ClockState::Invalid,
            clock,
            live_offset: settings.live_offset(),
            samples: 0,
            wraps: 0,
            fallbacks: 0,
        }
    }

    /// Feed the media clock reading of a decoded frame.
    pub fn update_current_time(&mut self, sample: MediaClockSample) {
        let now = self.clock.now();
        let (state, outcome) = self.state.apply_sample(sample, now, self.live_offset);
        self.state = state;
        match outcome {
            SampleOutcome::Rejected => {}
            SampleOutcome::Calibrated => self.samples += 1,
            SampleOutcome::Advanced { wrapped } => {
                self.samples += 1;
                if wrapped {
                    self.wraps += 1;
                }
            }
        }
    }

    /// Signal a frame that arrived without a usable timestamp.
    ///
    /// The estimate snaps to the assumed live edge and continuity is lost.
    pub fn mark_timestamp_unavailable(&mut self) {
        self.fallbacks += 1;
        self.apply(ClockEvent::TimestampUnavailable);
    }

    /// Apply an optional sample, falling back when the transport had none.
    pub fn on_frame(&mut self, sample: Option<MediaClockSample>) {
        match sample {
            Some(sample) => self.update_current_time(sample),
            None => self.mark_timestamp_unavailable(),
        }
    }

    fn apply(&mut self, event: ClockEvent) {
        let now = self.clock.now();
        self.state = self.state.reduce(event, now, self.live_offset);
    }

    /// Current estimate, or `None` before the first frame.
    pub fn current_time(&self) -> Option<Timestamp> {
        self.state.estimated_time()
    }

    /// Like [`current_time`](Self::current_time) but as a `Result`.
    ///
    /// # Errors
    /// [`SyncError::ClockUnavailable`] before the first frame.
    pub fn try_current_time(&self) -> Result<Timestamp, SyncError> {
        self.current_time().ok_or(SyncError::ClockUnavailable)
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Forget calibration. The next frame cold-starts the clock.
    pub fn reset(&mut self) {
        self.state = ClockState::Invalid;
    }

    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    pub fn wrap_count(&self) -> u64 {
        self.wraps
    }

    pub fn fallback_count(&self) -> u64 {
        self.fallbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn estimator() -> (MediaClockEstimator<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
        (
            MediaClockEstimator::with_clock(clock.clone(), &SyncSettings::default()),
            clock,
        )
    }

    #[test]
    fn reports_unavailable_before_first_frame() {
        let (estimator, _) = estimator();
        assert_eq!(estimator.current_time(), None);
        assert_eq!(estimator.try_current_time(), Err(SyncError::ClockUnavailable));
    }

    #[test]
    fn wall_clock_only_matters_at_calibration() {
        let (mut estimator, clock) = estimator();
        estimator.update_current_time(MediaClockSample::rtp_video(0));
        let calibrated = estimator.current_time().unwrap();
        assert_eq!(calibrated, Timestamp::from_secs(1_700_000_000 - 2));

        clock.advance(Duration::from_secs(10));
        estimator.update_current_time(MediaClockSample::rtp_video(45_000));
        let after = estimator.current_time().unwrap();
        assert_eq!(after.as_nanos() - calibrated.as_nanos(), 500_000_000);
    }

    #[test]
    fn counts_wraps_and_fallbacks() {
        let (mut estimator, _) = estimator();
        estimator.update_current_time(MediaClockSample::rtp_video(u32::MAX - 99));
        estimator.update_current_time(MediaClockSample::rtp_video(50));
        estimator.on_frame(None);
        assert_eq!(estimator.wrap_count(), 1);
        assert_eq!(estimator.fallback_count(), 1);
        assert_eq!(estimator.sample_count(), 2);
    }

    #[test]
    fn zero_rate_samples_are_not_counted() {
        let (mut estimator, _) = estimator();
        estimator.update_current_time(MediaClockSample::rtp_video(1_000));
        estimator.update_current_time(MediaClockSample::new(10, 0));
        estimator.update_current_time(MediaClockSample::new(5, 0));
        assert_eq!(estimator.sample_count(), 1);
        assert_eq!(estimator.wrap_count(), 0);
        assert_eq!(estimator.state().last_raw_ticks(), Some(1_000));
    }

    #[test]
    fn fallback_pins_to_live_edge() {
        let (mut estimator, clock) = estimator();
        estimator.update_current_time(MediaClockSample::rtp_video(0));
        estimator.update_current_time(MediaClockSample::rtp_video(900_000));
        clock.advance(Duration::from_secs(60));
        estimator.mark_timestamp_unavailable();
        assert_eq!(
            estimator.current_time(),
            Some(clock.now() - Duration::from_secs(2))
        );
    }

    #[test]
    fn reset_requires_recalibration() {
        let (mut estimator, _) = estimator();
        estimator.update_current_time(MediaClockSample::rtp_video(10));
        estimator.reset();
        assert!(estimator.current_time().is_none());
    }
}
