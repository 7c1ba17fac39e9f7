//! Player control and group drift correction.
//!
//! Data flows one way: the media clock feeds a [`PlaybackController`]'s
//! position, a [`DriftCorrector`] compares that position with the group's
//! target, and the resulting [`DriftDecision`] is applied back to the same
//! controller.

mod controller;
mod drift;
mod element;
mod group;
mod simulated;
mod sync;

pub use controller::PlaybackController;
pub use drift::{drift_ms, DriftCorrector, DriftDecision};
pub use element::{MediaElement, PlayerHandle};
pub use group::{GroupReport, PlayerReport, SyncGroup};
pub use simulated::SimulatedElement;
pub use sync::{
    sync_target, DriftStats, PlaybackOptions, SyncTargetReader, SyncTargetWriter, SyncedPlayer,
};
