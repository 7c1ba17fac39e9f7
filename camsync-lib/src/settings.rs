//! Tunables for the sync and prefetch components.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEBOUNCE_MS, INITIAL_RADIUS_SECS, LIVE_OFFSET_MS, MAX_DRIFT_ALLOWED_MS,
    NUM_INITIAL_THUMBNAILS, NUM_VISIBLE_THUMBNAILS, RTP_VIDEO_CLOCK_HZ,
};
use crate::error::SettingsError;

const MAX_INITIAL_RADIUS_SECS: u64 = 7 * 86_400;
const MAX_DEBOUNCE_MS: u64 = 60_000;
const MAX_THUMBNAILS: usize = 10_000;

/// Configuration bundle shared by every component.
///
/// Missing fields fall back to the values in [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    pub live_offset_ms: u64,
    pub clock_hz: u32,
    pub max_drift_allowed_ms: u64,
    pub debounce_ms: u64,
    pub num_initial_thumbnails: usize,
    pub initial_radius_secs: u64,
    pub num_visible_thumbnails: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            live_offset_ms: LIVE_OFFSET_MS,
            clock_hz: RTP_VIDEO_CLOCK_HZ,
            max_drift_allowed_ms: MAX_DRIFT_ALLOWED_MS,
            debounce_ms: DEBOUNCE_MS,
            num_initial_thumbnails: NUM_INITIAL_THUMBNAILS,
            initial_radius_secs: INITIAL_RADIUS_SECS,
            num_visible_thumbnails: NUM_VISIBLE_THUMBNAILS,
        }
    }
}

impl SyncSettings {
    /// Parse and validate settings from a JSON document.
    ///
    /// # Errors
    /// Returns [`SettingsError::Parse`] for malformed JSON or unknown fields and
    /// [`SettingsError::Invalid`] when a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: SyncSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.clock_hz == 0 {
            return Err(SettingsError::Invalid("clock_hz must be positive".into()));
        }
        if self.num_initial_thumbnails == 0 {
            return Err(SettingsError::Invalid(
                "num_initial_thumbnails must be positive".into(),
            ));
        }
        if self.num_visible_thumbnails == 0 {
            return Err(SettingsError::Invalid(
                "num_visible_thumbnails must be positive".into(),
            ));
        }
        if self.num_initial_thumbnails > MAX_THUMBNAILS
            || self.num_visible_thumbnails > MAX_THUMBNAILS
        {
            return Err(SettingsError::Invalid(format!(
                "thumbnail counts must be at most {}",
                MAX_THUMBNAILS
            )));
        }
        if self.initial_radius_secs > MAX_INITIAL_RADIUS_SECS {
            return Err(SettingsError::Invalid(format!(
                "initial_radius_secs must be at most {}",
                MAX_INITIAL_RADIUS_SECS
            )));
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(SettingsError::Invalid(format!(
                "debounce_ms must be at most {}",
                MAX_DEBOUNCE_MS
            )));
        }
        Ok(())
    }

    pub fn live_offset(&self) -> Duration {
        Duration::from_millis(self.live_offset_ms)
    }

    pub fn max_drift_allowed(&self) -> Duration {
        Duration::from_millis(self.max_drift_allowed_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn initial_radius(&self) -> Duration {
        Duration::from_secs(self.initial_radius_secs)
    }
}
