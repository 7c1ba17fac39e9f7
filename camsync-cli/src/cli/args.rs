//! CLI argument definitions for `camsync`.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("camsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Synchronize and inspect camera wall playback")
        .arg_required_else_help(true)
        .arg(
            Arg::new("settings")
                .long("settings")
                .short('c')
                .value_name("PATH")
                .global(true)
                .help("Path to a SyncSettings JSON file"),
        )
        .subcommand(
            Command::new("wall")
                .about("Run a simulated camera wall in a TUI")
                .arg(
                    Arg::new("players")
                        .long("players")
                        .short('n')
                        .value_name("COUNT")
                        .value_parser(value_parser!(usize))
                        .default_value("4")
                        .help("Number of recorded-clip players"),
                )
                .arg(
                    Arg::new("live")
                        .long("live")
                        .value_name("COUNT")
                        .value_parser(value_parser!(usize))
                        .default_value("1")
                        .help("Number of live players fed by a synthetic RTP clock"),
                )
                .arg(
                    Arg::new("max-skew-ppm")
                        .long("max-skew-ppm")
                        .value_name("PPM")
                        .value_parser(value_parser!(f64))
                        .default_value("5000")
                        .help("Largest random decode skew per player"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_name("SEED")
                        .value_parser(value_parser!(u64))
                        .help("Seed for player skews"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a headless drift simulation and print the final report")
                .arg(
                    Arg::new("players")
                        .long("players")
                        .short('n')
                        .value_name("COUNT")
                        .value_parser(value_parser!(usize))
                        .default_value("3")
                        .help("Number of recorded-clip players"),
                )
                .arg(
                    Arg::new("seconds")
                        .long("seconds")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .default_value("60")
                        .help("Simulated duration"),
                )
                .arg(
                    Arg::new("tick-ms")
                        .long("tick-ms")
                        .value_name("MS")
                        .value_parser(value_parser!(u64))
                        .default_value("100")
                        .help("Coordinator tick interval"),
                )
                .arg(
                    Arg::new("max-skew-ppm")
                        .long("max-skew-ppm")
                        .value_name("PPM")
                        .value_parser(value_parser!(f64))
                        .default_value("1000")
                        .help("Largest random decode skew per player"),
                )
                .arg(
                    Arg::new("start-offset-ms")
                        .long("start-offset-ms")
                        .value_name("MS")
                        .value_parser(value_parser!(i64))
                        .allow_negative_numbers(true)
                        .default_value("0")
                        .help("Player i starts at target + i * offset"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_name("SEED")
                        .value_parser(value_parser!(u64))
                        .help("Seed for player skews"),
                )
                .arg(
                    Arg::new("live")
                        .long("live")
                        .action(ArgAction::SetTrue)
                        .help("Add a live player fed by a synthetic RTP clock"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the final report as JSON"),
                ),
        )
        .subcommand(
            Command::new("rtp")
                .about("Replay RTP timestamps through the media clock estimator")
                .arg(
                    Arg::new("clock-hz")
                        .long("clock-hz")
                        .value_name("HZ")
                        .value_parser(value_parser!(u32))
                        .help("Media clock rate (defaults to the settings value)"),
                )
                .arg(
                    Arg::new("TICKS")
                        .help("Raw 32-bit timestamps, or - for a frame without one. Read from stdin when omitted")
                        .num_args(0..)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("thumbnails")
                .about("Print the thumbnail request set for a scrub state as JSON")
                .arg(
                    Arg::new("range-start")
                        .long("range-start")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .required(true)
                        .help("Start of the outer range, Unix seconds"),
                )
                .arg(
                    Arg::new("range-end")
                        .long("range-end")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .required(true)
                        .help("End of the outer range, Unix seconds"),
                )
                .arg(
                    Arg::new("playhead")
                        .long("playhead")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .help("Playhead, Unix seconds (defaults to the range midpoint)"),
                )
                .arg(
                    Arg::new("window")
                        .long("window")
                        .value_name("START:END")
                        .default_value("0:1")
                        .help("Visible window as two ratios"),
                )
                .arg(
                    Arg::new("initial-satisfied")
                        .long("initial-satisfied")
                        .action(ArgAction::SetTrue)
                        .help("Treat the first-paint batch as already loaded"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand(
                    Command::new("settings-json").about("Print the default SyncSettings JSON"),
                ),
        )
}
