use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn camsync() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("camsync"))
}

#[test]
fn create_settings_json_outputs_defaults() {
    camsync()
        .args(["create", "settings-json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"live_offset_ms\": 2000"))
        .stdout(predicate::str::contains("\"clock_hz\": 90000"))
        .stdout(predicate::str::contains("\"max_drift_allowed_ms\": 100"))
        .stdout(predicate::str::contains("\"debounce_ms\": 300"));
}

#[test]
fn rtp_replay_handles_counter_wrap() {
    camsync()
        .args(["rtp", "4294967196", "50", "-", "90050"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ticks=50 delta=150 elapsed=0.001667"))
        .stdout(predicate::str::contains("ticks=- delta=- elapsed=0.000000 state=assumed"))
        .stdout(predicate::str::contains("samples=3 wraps=1 fallbacks=1"));
}

#[test]
fn rtp_reads_ticks_from_stdin() {
    camsync()
        .arg("rtp")
        .write_stdin("0\n90000\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("ticks=90000 delta=90000 elapsed=1.000000"));
}

#[test]
fn simulate_without_skew_never_seeks() {
    camsync()
        .args([
            "simulate",
            "--players",
            "3",
            "--seconds",
            "10",
            "--max-skew-ppm",
            "0",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seeks\": 0"))
        .stdout(predicate::str::contains("\"seeks\": 1").not());
}

#[test]
fn simulate_resyncs_offset_players_once() {
    camsync()
        .args([
            "simulate",
            "--players",
            "2",
            "--seconds",
            "5",
            "--max-skew-ppm",
            "0",
            "--start-offset-ms",
            "5000",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seeks\": 1"));
}

#[test]
fn thumbnails_start_with_first_paint_batch() {
    camsync()
        .args([
            "thumbnails",
            "--range-start",
            "1700000000",
            "--range-end",
            "1700086400",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phase\": \"Initial\""))
        .stdout(predicate::str::contains("\"Visible\"").not());
}

#[test]
fn thumbnails_fill_window_once_first_paint_loaded() {
    camsync()
        .args([
            "thumbnails",
            "--range-start",
            "1700000000",
            "--range-end",
            "1700003600",
            "--window",
            "0.2:0.8",
            "--initial-satisfied",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phase\": \"Visible\""))
        .stdout(predicate::str::contains("\"priority\": \"Initial\"").not());
}

#[test]
fn invalid_settings_file_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"max_drift_allowed_ms\": 100, \"bogus\": 1}}").unwrap();
    camsync()
        .args(["simulate", "--seconds", "1", "--settings"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("settings parse error"));
}

#[test]
fn settings_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"live_offset_ms\": 500}}").unwrap();
    camsync()
        .args(["rtp", "-", "--settings"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("state=assumed"));
}

#[test]
fn simulate_rejects_unrepresentable_duration() {
    camsync()
        .args(["simulate", "--seconds", "1e20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid argument"));
}

#[test]
fn thumbnails_accept_ranges_at_the_timestamp_limits() {
    camsync()
        .args(["thumbnails", "--range-start=-1e300", "--range-end=0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phase\": \"Initial\""));
}

#[test]
fn oversized_prefetch_radius_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"initial_radius_secs\": 18446744073709551615}}").unwrap();
    camsync()
        .args(["thumbnails", "--range-start", "0", "--range-end", "3600", "--settings"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("initial_radius_secs must be at most"));
}
