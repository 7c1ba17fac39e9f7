//! Lifecycle and command application for one mounted player.

use log::{debug, info, warn};

use crate::clock::{MediaClockEstimator, MediaClockSample};
use crate::error::SyncError;
use crate::time::{SystemWallClock, Timestamp, WallClock};

use super::drift::DriftDecision;
use super::element::{MediaElement, PlayerHandle};

/// Owns one video element for as long as it is mounted.
///
/// Commands that arrive before the element is attached and ready are dropped,
/// never queued. The next state change re-applies whatever is current.
pub struct PlaybackController<E: MediaElement, C: WallClock = SystemWallClock> {
    element: Option<E>,
    estimator: MediaClockEstimator<C>,
    is_live: bool,
}

impl<E: MediaElement, C: WallClock> PlaybackController<E, C> {
    /// Create a controller with no element attached yet.
    ///
    /// # Arguments
    ///
    /// * `estimator` - Media clock used for the position of live streams.
    /// * `is_live` - Whether the element shows a live stream or a clip.
    pub fn new(estimator: MediaClockEstimator<C>, is_live: bool) -> Self {
        Self {
            element: None,
            estimator,
            is_live,
        }
    }

    /// Take ownership of a freshly mounted element.
    ///
    /// A previously attached element is released first.
    pub fn attach(&mut self, element: E) {
        if let Some(mut previous) = self.element.take() {
            previous.release();
        }
        debug!("attached player element (live={})", self.is_live);
        self.element = Some(element);
    }

    /// Release and hand back the element on unmount.
    ///
    /// The media clock is reset even when no element is attached.
    pub fn detach(&mut self) -> Option<E> {
        self.estimator.reset();
        let mut element = self.element.take()?;
        element.release();
        debug!("detached player element");
        Some(element)
    }

    pub fn is_attached(&self) -> bool {
        self.element.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.element.as_ref().is_some_and(|element| element.is_ready())
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn set_live(&mut self, is_live: bool) {
        if self.is_live != is_live {
            debug!("player switched to {}", if is_live { "live" } else { "clip" });
            self.is_live = is_live;
        }
    }

    fn ready_element(&mut self) -> Result<&mut E, SyncError> {
        match self.element.as_mut() {
            Some(element) if element.is_ready() => Ok(element),
            _ => Err(SyncError::PlayerNotReady),
        }
    }

    /// Play or pause and apply the user-selected rate.
    ///
    /// Live elements are held at 1.0 since a moving edge cannot be sped up.
    pub fn apply_playback_state(&mut self, is_playing: bool, playback_rate: f64) {
        let is_live = self.is_live;
        let element = match self.ready_element() {
            Ok(element) => element,
            Err(err) => {
                debug!("dropping playback state: {}", err);
                return;
            }
        };

        if is_live && playback_rate != 1.0 {
            warn!("live player asked for rate {}; holding 1.0", playback_rate);
            element.set_playback_rate(1.0);
        } else if playback_rate.is_finite() && playback_rate > 0.0 {
            element.set_playback_rate(playback_rate);
        } else {
            warn!("ignoring invalid playback rate {}", playback_rate);
        }

        if is_playing {
            if element.is_paused() {
                element.play();
            }
        } else if !element.is_paused() {
            element.pause();
        }
    }

    /// Apply a drift decision. Must run after the tick's playback state.
    pub fn apply_drift_decision(&mut self, decision: DriftDecision) {
        if decision == DriftDecision::NoAction {
            return;
        }
        let is_live = self.is_live;
        let element = match self.ready_element() {
            Ok(element) => element,
            Err(err) => {
                debug!("dropping drift decision {:?}: {}", decision, err);
                return;
            }
        };
        match decision {
            DriftDecision::Seek(target) => {
                info!("seeking player to {}", target);
                element.set_current_time(target);
            }
            DriftDecision::AdjustRate(factor) if !is_live && factor.is_finite() && factor > 0.0 => {
                element.set_playback_rate(factor);
            }
            DriftDecision::AdjustRate(factor) => {
                warn!("ignoring rate adjustment {} (live={})", factor, is_live);
            }
            DriftDecision::NoAction => {}
        }
    }

    /// Forward a decoded frame's media clock reading to the estimator.
    pub fn on_frame(&mut self, sample: Option<MediaClockSample>) {
        self.estimator.on_frame(sample);
    }

    /// Estimated playing time.
    ///
    /// Live streams report the media clock estimate; clips report the element
    /// position. `None` when neither is available.
    pub fn current_time(&self) -> Option<Timestamp> {
        if self.is_live {
            return self.estimator.current_time();
        }
        self.element
            .as_ref()
            .filter(|element| element.is_ready())
            .and_then(|element| element.current_time())
    }

    pub fn handle(&self) -> Option<PlayerHandle> {
        let element = self.element.as_ref().filter(|element| element.is_ready())?;
        Some(PlayerHandle {
            current_playback_rate: element.playback_rate(),
            is_playing: !element.is_paused(),
            current_position: self.current_time(),
        })
    }

    pub fn estimator(&self) -> &MediaClockEstimator<C> {
        &self.estimator
    }

    pub fn element(&self) -> Option<&E> {
        self.element.as_ref()
    }

    pub fn element_mut(&mut self) -> Option<&mut E> {
        self.element.as_mut()
    }
}

impl<E: MediaElement, C: WallClock> Drop for PlaybackController<E, C> {
    fn drop(&mut self) {
        if let Some(element) = self.element.as_mut() {
            element.release();
        }
    }
}
