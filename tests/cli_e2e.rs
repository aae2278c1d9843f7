//! End-to-end CLI tests for the albumdl binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's config and terminal settings.
fn albumdl(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("albumdl").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(config_home: &TempDir, contents: &str) {
    let dir = config_home.path().join("albumdl");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

fn toml_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

#[test]
fn test_help_lists_download_flags() {
    let home = TempDir::new().unwrap();
    albumdl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--proxy"))
        .stdout(predicate::str::contains("--extract"));
}

#[test]
fn test_invalid_flag_exits_with_usage_error() {
    let home = TempDir::new().unwrap();
    albumdl(&home).arg("--no-such-flag").assert().code(2);
}

#[test]
fn test_out_of_range_concurrency_exits_with_usage_error() {
    let home = TempDir::new().unwrap();
    albumdl(&home)
        .args(["-c", "0", "https://pixeldrain.com/l/abc"])
        .assert()
        .code(2);
}

#[test]
fn test_no_input_prints_guidance_and_succeeds() {
    let home = TempDir::new().unwrap();
    albumdl(&home)
        .assert()
        .success()
        .stderr(predicate::str::contains("No album URLs given"));
}

#[test]
fn test_unsupported_host_is_reported_but_run_completes() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    albumdl(&home)
        .args(["-o"])
        .arg(out.path())
        .arg("https://example.com/album/1")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Error: https://example.com/album/1: unsupported host",
        ))
        .stdout(predicate::str::contains("Done: 1 albums (1 failed)"));
}

#[test]
fn test_scheme_less_locator_is_reported_as_failed_album() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    albumdl(&home)
        .arg("-o")
        .arg(out.path())
        .arg("pixeldrain.com/l/abc")
        .assert()
        .success()
        .stdout(predicate::str::contains("Error: pixeldrain.com/l/abc:"))
        .stdout(predicate::str::contains("Done: 1 albums (1 failed)"))
        .stderr(predicate::str::contains("No album URLs given").not());
}

#[test]
fn test_quiet_mode_reports_album_errors_on_stderr_only() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    albumdl(&home)
        .arg("-q")
        .arg("-o")
        .arg(out.path())
        .arg("https://example.com/album/1")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unsupported host"));
}

#[test]
fn test_config_output_dir_is_used() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let target = out.path().join("from-config");
    write_config(
        &home,
        &format!("output_dir = \"{}\"\n", toml_path(&target)),
    );

    albumdl(&home)
        .arg("https://example.com/album/1")
        .assert()
        .success();

    assert!(target.is_dir());
}

#[test]
fn test_invalid_config_fails_to_start() {
    let home = TempDir::new().unwrap();
    write_config(&home, "colour = true\n");

    albumdl(&home)
        .arg("https://pixeldrain.com/l/abc")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_missing_explicit_config_fails_to_start() {
    let home = TempDir::new().unwrap();
    albumdl(&home)
        .args(["--config", "/nonexistent/albumdl/config.toml"])
        .arg("https://pixeldrain.com/l/abc")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_missing_input_file_fails_to_start() {
    let home = TempDir::new().unwrap();
    albumdl(&home)
        .args(["--input-file", "/nonexistent/albumdl/urls.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read URL list"));
}

#[test]
fn test_input_file_urls_are_processed() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let list = out.path().join("urls.txt");
    std::fs::write(
        &list,
        "# albums\n\nhttps://example.com/a\nhttps://example.org/b\n",
    )
    .unwrap();

    albumdl(&home)
        .arg("-o")
        .arg(out.path())
        .arg("--input-file")
        .arg(&list)
        .assert()
        .success()
        .stdout(predicate::str::contains("Done: 2 albums (2 failed)"));
}
