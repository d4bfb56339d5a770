//! Integration tests for the `adlc` binary

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn adlc(
    dir: &TempDir,
    args: &[&str],
) -> Output {
    Command::new(env!("CARGO_BIN_EXE_adlc"))
        .current_dir(dir.path())
        .args(args)
        .output()
        .unwrap()
}

/// Helper function to create a test file
fn create_test_file(
    dir: &TempDir,
    name: &str,
    content: &str,
) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const SOURCE: &str = "obj goodJets : jet\n  select pt > 30\n\nregion sr\n  select size(goodJets) >= 1\n";

#[test]
fn test_lex_command() {
    let dir = TempDir::new().unwrap();
    create_test_file(&dir, "a.adl", SOURCE);
    let output = adlc(&dir, &["lex", "a.adl"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("goodJets"));
}

#[test]
fn test_parse_command_dot() {
    let dir = TempDir::new().unwrap();
    create_test_file(&dir, "a.adl", SOURCE);
    let output = adlc(&dir, &["parse", "a.adl", "--dot"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("digraph"));
}

#[test]
fn test_ir_listing_and_json() {
    let dir = TempDir::new().unwrap();
    create_test_file(&dir, "a.adl", SOURCE);

    let output = adlc(&dir, &["ir", "a.adl"]);
    assert!(output.status.success());
    let listing = String::from_utf8_lossy(&output.stdout);
    assert!(listing.contains("<- CREATE_REGION"));
    assert!(listing.contains("DO_CUTFLOW_ON_REGION"));

    let output = adlc(&dir, &["ir", "a.adl", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["instructions"].as_array().unwrap().len() > 5);
}

#[test]
fn test_config_file_is_read() {
    let dir = TempDir::new().unwrap();
    create_test_file(&dir, "a.adl", SOURCE);
    create_test_file(&dir, "adlc.toml", "cutflow = \"none\"\n");

    let output = adlc(&dir, &["ir", "a.adl"]);
    assert!(output.status.success());
    let listing = String::from_utf8_lossy(&output.stdout);
    assert!(!listing.contains("DO_CUTFLOW_ON_REGION"));
}

#[test]
fn test_invalid_file_fails() {
    let dir = TempDir::new().unwrap();
    create_test_file(&dir, "bad.adl", "region sr\n  select pt > )\n");
    let output = adlc(&dir, &["ir", "bad.adl"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to compile"));
}
