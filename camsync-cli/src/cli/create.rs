//! `create` subcommands that emit default payloads.

use camsync_lib::settings::SyncSettings;
use clap::ArgMatches;

use super::CliError;

pub fn run_create(args: &ArgMatches) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("settings-json", _)) => {
            println!("{}", SyncSettings::default().to_json_pretty()?);
            Ok(0)
        }
        _ => Err(CliError::InvalidArgument(
            "create needs a payload name, e.g. settings-json".to_string(),
        )),
    }
}
