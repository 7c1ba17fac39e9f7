//! Narrow interface to the external video element.

use serde::Serialize;

use crate::time::Timestamp;

/// Snapshot of one managed video element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerHandle {
    pub current_playback_rate: f64,
    pub is_playing: bool,
    pub current_position: Option<Timestamp>,
}

/// Operations a controller needs from a video element.
///
/// Implementations wrap whatever actually presents frames. Decoding and
/// transport stay behind this trait.
pub trait MediaElement: Send {
    /// Mounted with media loaded.
    fn is_ready(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    /// Presentation position, `None` when nothing is loaded.
    fn current_time(&self) -> Option<Timestamp>;
    /// Jump directly to `time` without a pause/play cycle.
    fn set_current_time(&mut self, time: Timestamp);
    /// Free object URLs, timers and other per-mount resources.
    fn release(&mut self) {}
}
