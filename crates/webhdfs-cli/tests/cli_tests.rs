//! CLI integration tests for webhdfs.
//!
//! These tests verify command-line argument parsing, help output, and exit
//! codes for various error conditions. No live cluster is needed: connection
//! handling is exercised against a closed local port, and path resolution
//! against an absolute root never leaves the process.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the webhdfs binary, isolated from ambient config.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("webhdfs").unwrap();
    cmd.env_remove("WEBHDFS_CONFIG");
    cmd
}

/// Write a config file whose only endpoint is a closed local port.
fn offline_config() -> tempfile::NamedTempFile {
    config_file(
        r#"
default_alias: test
aliases:
  test:
    endpoints: ["http://127.0.0.1:1"]
    root: /data
"#,
    )
}

fn config_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("ls"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("mkdir"))
        .stdout(predicate::str::contains("mv"))
        .stdout(predicate::str::contains("rm"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_upload_subcommand_help() {
    cmd()
        .args(["upload", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--threads"))
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--append"))
        .stdout(predicate::str::contains("--silent"));
}

#[test]
fn test_append_conflicts_with_force() {
    cmd()
        .args(["upload", "x", "/dest", "--append", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_download_subcommand_help() {
    cmd()
        .args(["download", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stdout"))
        .stdout(predicate::str::contains("--threads"));
}

#[test]
fn test_rm_subcommand_help() {
    cmd()
        .args(["rm", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--recursive"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("webhdfs"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_config_and_alias_flags_exist() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--alias"));
}

// =============================================================================
// Exit Code Tests - Config Errors
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not a config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "ls", "/"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let file = config_file("invalid: yaml: content: [");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "ls", "/"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = config_file("");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "ls", "/"])
        .assert()
        .code(1);
}

#[test]
fn test_endpoint_without_scheme_exits_with_code_1() {
    let file = config_file(
        r#"
aliases:
  bad:
    endpoints: ["namenode:9870"]
"#,
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "ls", "/"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must start with"));
}

#[test]
fn test_unknown_alias_exits_with_code_1() {
    let file = offline_config();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["--alias", "staging", "ls", "/"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("staging"));
}

// =============================================================================
// Exit Code Tests - Connection and Precondition Errors
// =============================================================================

#[test]
fn test_connection_failure_exits_with_code_4() {
    let file = offline_config();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "ls", "/"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Connection"));
}

#[test]
fn test_missing_upload_source_exits_with_code_2() {
    let file = offline_config();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["upload", "/no/such/file", "/dest", "--silent"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_append_with_directory_exits_with_code_2() {
    let file = offline_config();
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["upload", dir.path().to_str().unwrap(), "/dest", "--append"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("single file"));
}

#[test]
fn test_stdin_upload_connection_failure_exits_with_code_4() {
    let file = offline_config();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["upload", "-", "/dest"])
        .write_stdin("streamed bytes")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Connection"));
}

// =============================================================================
// Offline Path Resolution
// =============================================================================

#[test]
fn test_resolve_normalizes_absolute_paths() {
    let file = offline_config();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["resolve", "/tmp/../x/./y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/x/y"));
}

#[test]
fn test_resolve_joins_relative_under_root() {
    let file = offline_config();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["resolve", "logs/app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/data/logs/app"));
}

#[test]
fn test_config_discovered_via_env_var() {
    let file = offline_config();

    let mut cmd = Command::cargo_bin("webhdfs").unwrap();
    cmd.env("WEBHDFS_CONFIG", file.path())
        .args(["resolve", "/x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/x"));
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
