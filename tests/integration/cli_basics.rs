//! Smoke test for the bundled CLI binary.

use assert_cmd::Command;
use tempfile::tempdir;

fn burrow_cmd() -> Command {
    Command::cargo_bin("burrow").expect("binary built")
}

#[test]
fn create_load_get_roundtrip() {
    let dir = tempdir().expect("temp dir");
    let file = dir.path().join("employees.idx");
    let file_arg = file.to_str().expect("utf-8 path");

    burrow_cmd()
        .args(["--file", file_arg, "create", "--table", "employee"])
        .assert()
        .success();

    burrow_cmd()
        .args(["--file", file_arg, "load", "--count", "25"])
        .assert()
        .success();

    let output = burrow_cmd()
        .args(["--file", file_arg, "get", "--key", "10"])
        .output()
        .expect("run get");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("id=10"), "unexpected output: {stdout}");

    let output = burrow_cmd()
        .args(["--file", file_arg, "get", "--key", "999"])
        .output()
        .expect("run get");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not found"), "unexpected output: {stdout}");

    let output = burrow_cmd()
        .args(["--file", file_arg, "stats"])
        .output()
        .expect("run stats");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("height"), "unexpected output: {stdout}");
}

#[test]
fn get_on_missing_file_fails() {
    let dir = tempdir().expect("temp dir");
    let file = dir.path().join("absent.idx");

    burrow_cmd()
        .args(["--file", file.to_str().expect("utf-8 path"), "get", "--key", "1"])
        .assert()
        .failure();
}
