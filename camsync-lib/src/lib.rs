//! # camsync
//!
//! Playback synchronization for camera video walls. It estimates each live
//! stream's wall-clock position from RTP media timestamps, keeps recorded-clip
//! players within a drift dead-band of a shared target, and schedules bounded
//! thumbnail prefetches for the scrub overlay.

pub mod clock;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod playback;
pub mod settings;
pub mod thumbnails;
pub mod time;
