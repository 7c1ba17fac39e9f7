//! Dead-band drift correction for group-synchronized clip playback.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::settings::SyncSettings;
use crate::time::Timestamp;

/// What a player should do to stay with its group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DriftDecision {
    NoAction,
    /// Change playback speed by the given factor. Not produced by
    /// [`DriftCorrector`]; kept for controllers driven by other policies.
    AdjustRate(f64),
    Seek(Timestamp),
}

/// Decides between leaving a player alone and hard-seeking it.
///
/// Drift inside the dead-band is left to self-correct. Anything larger is
/// closed in one seek rather than by rate nudging. Live players are never
/// resynchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCorrector {
    max_drift_allowed: Duration,
}

impl DriftCorrector {
    pub fn new(max_drift_allowed: Duration) -> Self {
        Self { max_drift_allowed }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(settings.max_drift_allowed())
    }

    pub fn max_drift_allowed(&self) -> Duration {
        self.max_drift_allowed
    }

    /// Evaluate one player against the group's target.
    ///
    /// # Arguments
    ///
    /// * `player_position` - Where the player currently is.
    /// * `sync_target` - Where the group agrees playback should be.
    /// * `is_live` - Live players always get [`DriftDecision::NoAction`].
    pub fn evaluate(
        &self,
        player_position: Timestamp,
        sync_target: Timestamp,
        is_live: bool,
    ) -> DriftDecision {
        if is_live {
            return DriftDecision::NoAction;
        }
        let diff_ms = drift_ms(player_position, sync_target);
        let allowed_ms = self.max_drift_allowed.as_secs_f64() * 1_000.0;
        if diff_ms.abs() <= allowed_ms {
            DriftDecision::NoAction
        } else {
            DriftDecision::Seek(sync_target)
        }
    }
}

impl Default for DriftCorrector {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

/// Signed drift in milliseconds: positive when the player is behind the target.
pub fn drift_ms(player_position: Timestamp, sync_target: Timestamp) -> f64 {
    player_position.millis_until(sync_target)
}
