use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::PathBuf;

/// Helper to get a temporary config directory
fn temp_config_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp dir")
}

/// Helper to get config file path in the temp dir
fn config_file_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join(".baripronto").join("config.json")
}

const BINARY_NAME: &str = "baripronto";

#[test]
/// Help command should display usage information.
fn cli_help_displays_usage() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(contains("Command-line arguments"));
}

#[test]
/// Connect command should create the config file without touching the network.
fn connect_command_creates_config_file() {
    let tmp = temp_config_dir();
    let config_path = config_file_path(&tmp);

    // Ensure the file does not exist initially
    assert!(!config_path.exists());

    let mut cmd = Command::cargo_bin(BINARY_NAME).unwrap();
    cmd.arg("connect")
        .arg("--url")
        .arg("https://registry.example.com")
        .arg("--key")
        .arg("anon-key")
        .env("HOME", tmp.path()) // simulate different $HOME
        .assert()
        .success()
        .stdout(contains("Connection settings saved"));

    // Confirm the file was created
    assert!(config_path.exists());
}

#[test]
/// Disconnect command should delete an existing config file.
fn disconnect_deletes_config_file() {
    let tmp = temp_config_dir();
    let config_path = config_file_path(&tmp);
    fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    fs::write(&config_path, "{}").unwrap();

    // Ensure the file exists
    assert!(config_path.exists());

    let mut cmd = Command::cargo_bin(BINARY_NAME).unwrap();
    cmd.arg("disconnect")
        .env("HOME", tmp.path()) // simulate different $HOME
        .assert()
        .success()
        .stdout(contains("Removing saved connection settings"));

    // Confirm the file was deleted
    assert!(!config_path.exists());
}

#[test]
/// An empty patient name must fail local validation before any network call;
/// the fake endpoint guarantees a request would error differently.
fn add_patient_rejects_blank_name() {
    let tmp = temp_config_dir();

    let mut cmd = Command::cargo_bin(BINARY_NAME).unwrap();
    cmd.arg("add-patient")
        .arg("--name")
        .arg("   ")
        .env("HOME", tmp.path())
        .env("BARIPRONTO_URL", "http://127.0.0.1:9") // nothing listens here
        .env("BARIPRONTO_KEY", "anon-key")
        .assert()
        .failure()
        .stderr(contains("name required"));
}

#[test]
/// A malformed birth date must also fail locally.
fn add_patient_rejects_bad_birth_date() {
    let tmp = temp_config_dir();

    let mut cmd = Command::cargo_bin(BINARY_NAME).unwrap();
    cmd.arg("add-patient")
        .arg("--name")
        .arg("Ana")
        .arg("--birth-date")
        .arg("02/03/1994")
        .env("HOME", tmp.path())
        .env("BARIPRONTO_URL", "http://127.0.0.1:9")
        .env("BARIPRONTO_KEY", "anon-key")
        .assert()
        .failure()
        .stderr(contains("ISO date"));
}

#[test]
/// Without connection settings, commands fail before any query is attempted.
fn summary_without_config_is_a_configuration_error() {
    let tmp = temp_config_dir();

    let mut cmd = Command::cargo_bin(BINARY_NAME).unwrap();
    cmd.arg("summary")
        .env("HOME", tmp.path())
        .env_remove("BARIPRONTO_URL")
        .env_remove("BARIPRONTO_KEY")
        .assert()
        .failure()
        .stderr(contains("BARIPRONTO_URL"));
}
