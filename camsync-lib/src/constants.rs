//! Shared constants for clock calibration, drift correction and prefetching.

/// Assumed latency between the live edge and wall-clock "now" (ms).
///
/// A freshly calibrated media clock reports `now - LIVE_OFFSET_MS`. This is a
/// heuristic for typical live-edge latency, not a measured offset.
pub const LIVE_OFFSET_MS: u64 = 2_000;

/// Media clock rate used by RTP video payloads (Hz).
pub const RTP_VIDEO_CLOCK_HZ: u32 = 90_000;

/// Dead-band inside which a clip player is left alone (ms).
pub const MAX_DRIFT_ALLOWED_MS: u64 = 100;

/// Quiet period before a scrubbed window is emitted (ms).
pub const DEBOUNCE_MS: u64 = 300;

/// Size of the first-paint thumbnail batch around the playhead.
pub const NUM_INITIAL_THUMBNAILS: usize = 12;

/// Radius around the playhead that the first-paint batch is drawn from (s).
pub const INITIAL_RADIUS_SECS: u64 = 10 * 60;

/// Upper bound on thumbnails requested for the visible window.
pub const NUM_VISIBLE_THUMBNAILS: usize = 100;
