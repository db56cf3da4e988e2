use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

const CSV: &str = "Date,Open,High,Low,Close,Volume\n\
2023-01-01,100.50,102.75,99.25,101.80,1500000\n\
2023-01-02,abc,1,1,1,1\n\
2023-01-03,101.80,103.10,100.90,102.40,1320000";

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn ohlcv() -> Command {
    Command::cargo_bin("ohlcv").unwrap()
}

#[test]
fn prints_valid_bars_from_file() {
    let file = csv_file(CSV);

    ohlcv()
        .arg("--input")
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            "1672531200|100.5|102.75|99.25|101.8|1500000\n\
1672704000|101.8|103.1|100.9|102.4|1320000\n",
        );
}

#[test]
fn reads_stdin_with_tiny_chunks() {
    ohlcv()
        .args(["--chunk-size", "3"])
        .write_stdin(CSV)
        .assert()
        .success()
        .stdout(predicate::str::contains("1672531200|100.5"))
        .stdout(predicate::str::contains("1672704000|101.8"));
}

#[test]
fn json_format_emits_one_object_per_line() {
    let file = csv_file(CSV);

    ohlcv()
        .arg("--input")
        .arg(file.path())
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"timestamp":1672531200,"open":100.5,"high":102.75,"low":99.25,"close":101.8,"volume":1500000}"#,
        ))
        .stdout(predicate::function(|out: &str| out.lines().count() == 2));
}

#[test]
fn skipped_lines_are_logged() {
    ohlcv()
        .env("RUST_LOG", "warn")
        .write_stdin(CSV)
        .assert()
        .success()
        .stderr(predicate::str::contains("invalid-field-value [open]"))
        .stderr(predicate::str::contains("line 3"));
}

#[test]
fn fail_on_skip_sets_error_exit() {
    ohlcv()
        .arg("--fail-on-skip")
        .write_stdin(CSV)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 line(s) skipped"));
}

#[test]
fn clean_input_passes_fail_on_skip() {
    ohlcv()
        .arg("--fail-on-skip")
        .write_stdin("Date,Open,High,Low,Close,Volume\n2023-01-01,1,2,1,1,10\n")
        .assert()
        .success()
        .stdout("1672531200|1|2|1|1|10\n");
}

#[test]
fn missing_input_file_fails() {
    ohlcv()
        .args(["--input", "/definitely/not/here.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input file not found"));
}
