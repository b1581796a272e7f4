mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{read_output, write_payments};
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_payments(
        &dir.path().join("payments.csv"),
        &[("1", "Alice", "10.00"), ("2", "Bob", "20.00")],
    )?;

    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(dir.path()).arg("--poll-interval-ms").arg("10");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("input,output,records_written,failed"))
        .stdout(predicate::str::contains("payments.csv.out,2,0"));

    let rows = read_output(&dir.path().join("payments.csv.out"));
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][5], "2000");

    Ok(())
}

#[test]
fn test_cli_receive_mode_with_declined_recipient() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_payments(
        &dir.path().join("payments.csv"),
        &[("1", "Alice", "10.00"), ("2", "Mallory", "20.00")],
    )?;

    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(dir.path())
        .args(["--poll-interval-ms", "10", "--ack-mode", "receive"])
        .args(["--decline", "Mallory"]);

    cmd.assert().success();

    let rows = read_output(&dir.path().join("payments.csv.out"));
    assert_eq!(&rows[1][5], "4000");

    Ok(())
}

#[test]
fn test_cli_config_file_is_applied() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{ "poll": { "interval_ms": 10, "max_elapsed_ms": 1000 } }"#)?;
    write_payments(&dir.path().join("one.csv"), &[("7", "Alice", "1.00")])?;

    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(dir.path()).arg("--config").arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("one.csv.out,1,0"));

    Ok(())
}

#[test]
fn test_cli_missing_folder_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(dir.path().join("missing"));
    cmd.assert().failure();
}

#[test]
fn test_cli_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::new(cargo_bin!("payflow"));
    cmd.arg(dir.path()).args(["--poll-interval-ms", "0"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("poll.interval_ms"));
}
