use std::fmt::{Display, Formatter};

use crate::time::Timestamp;

/// Non-fatal failures of the synchronization subsystem.
///
/// None of these abort playback. They surface as "no clock", "nothing applied"
/// or "missing thumbnail" to callers that already handle those cases.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    ClockUnavailable,
    PlayerNotReady,
    ThumbnailFetchFailed { timestamp: Timestamp, reason: String },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClockUnavailable => write!(f, "no media clock estimate yet"),
            Self::PlayerNotReady => write!(f, "player is not ready"),
            Self::ThumbnailFetchFailed { timestamp, reason } => {
                write!(f, "thumbnail fetch failed at {}: {}", timestamp, reason)
            }
        }
    }
}

impl std::error::Error for SyncError {}

/// Error type for loading and validating [`SyncSettings`](crate::settings::SyncSettings).
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Parse(err) => write!(f, "settings parse error: {}", err),
            Self::Invalid(err) => write!(f, "invalid settings: {}", err),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<std::io::Error> for SettingsError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}
