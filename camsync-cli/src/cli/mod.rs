//! Subcommand implementations and shared argument helpers.

use std::fmt::{Display, Formatter};

use camsync_lib::error::SettingsError;
use camsync_lib::settings::SyncSettings;
use clap::ArgMatches;
use log::info;

pub mod args;
pub mod create;
pub mod rtp;
pub mod simulate;
pub mod thumbnails;

/// Failures surfaced to `main` as a non-zero exit.
#[derive(Debug)]
pub enum CliError {
    Settings(SettingsError),
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidArgument(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Settings(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Json(err) => write!(f, "json error: {}", err),
            Self::InvalidArgument(err) => write!(f, "invalid argument: {}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<SettingsError> for CliError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Load `--settings` if given, otherwise defaults.
pub fn load_settings(args: &ArgMatches) -> Result<SyncSettings, CliError> {
    match args.get_one::<String>("settings") {
        Some(path) => {
            let settings = SyncSettings::from_json_file(path)?;
            info!("loaded settings from {}", path);
            Ok(settings)
        }
        None => Ok(SyncSettings::default()),
    }
}

/// Fetch a typed argument that has a default value.
pub fn value<T: Clone + Send + Sync + 'static>(
    args: &ArgMatches,
    name: &str,
) -> Result<T, CliError> {
    args.get_one::<T>(name)
        .cloned()
        .ok_or_else(|| CliError::InvalidArgument(format!("missing --{}", name)))
}
