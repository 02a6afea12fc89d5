//! CLI integration tests for the `atelier` subcommands.
//!
//! Uses `assert_cmd` to spawn the `atelier` binary and verify
//! exit codes, stdout content, and stderr content. None of these tests
//! reach the Gemini API: generation commands are exercised only up to
//! input validation and the missing-credentials check.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Smallest byte prefix the format sniffer recognizes as PNG.
const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0x0d];

/// Helper: create a Command for the `atelier` binary with no Gemini
/// credentials and no log filter from the caller's environment.
fn atelier() -> Command {
    let mut cmd = cargo_bin_cmd!("atelier");
    cmd.env_remove("GEMINI_API_KEY");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    atelier()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Virtual try-on studio"));
}

#[test]
fn version_exits_0() {
    atelier()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("atelier"));
}

#[test]
fn generate_help_lists_operations() {
    atelier()
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("model"))
        .stdout(predicate::str::contains("try-on"))
        .stdout(predicate::str::contains("pose"));
}

#[test]
fn unknown_subcommand_fails() {
    atelier().arg("undress").assert().failure();
}

// ──────────────────────────────────────────────
// 2. Catalog listings
// ──────────────────────────────────────────────

#[test]
fn poses_lists_default_catalog() {
    atelier()
        .arg("poses")
        .assert()
        .success()
        .stdout(predicate::str::contains("Full frontal view, hands on hips"))
        .stdout(predicate::str::contains("Side profile view"));
}

#[test]
fn poses_json_has_indices() {
    let output = atelier().args(["--output", "json", "poses"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let poses = json["poses"].as_array().unwrap();
    assert_eq!(poses.len(), 6);
    assert_eq!(poses[0]["index"], 0);
    assert_eq!(poses[0]["instruction"], "Full frontal view, hands on hips");
}

#[test]
fn wardrobe_json_lists_default_garments() {
    let output = atelier()
        .args(["wardrobe", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = json["wardrobe"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["black-jodhpuri", "purple-suit"]);
}

// ──────────────────────────────────────────────
// 3. Config file
// ──────────────────────────────────────────────

#[test]
fn config_file_overrides_catalog_and_wardrobe() {
    let tmp = TempDir::new().unwrap();
    let config = write_file(
        &tmp,
        "atelier.toml",
        br#"
[studio]
poses = ["Front", "Back"]

[[wardrobe]]
id = "coat"
name = "Wool Coat"
image = "https://example.com/coat.png"
"#,
    );

    atelier()
        .arg("--config")
        .arg(&config)
        .arg("poses")
        .assert()
        .success()
        .stdout(predicate::str::contains("Back"))
        .stdout(predicate::str::contains("Side profile view").not());

    atelier()
        .arg("--config")
        .arg(&config)
        .arg("wardrobe")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wool Coat"))
        .stdout(predicate::str::contains("black-jodhpuri").not());
}

#[test]
fn invalid_config_file_exits_1() {
    let tmp = TempDir::new().unwrap();
    let config = write_file(&tmp, "atelier.toml", b"[studio]\nposes = []\n");
    atelier()
        .arg("--config")
        .arg(&config)
        .arg("poses")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn missing_config_file_exits_1() {
    atelier()
        .args(["--config", "/nonexistent/atelier.toml", "poses"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read config file"));
}

// ──────────────────────────────────────────────
// 4. Generate (no network)
// ──────────────────────────────────────────────

#[test]
fn generate_model_rejects_non_image() {
    let tmp = TempDir::new().unwrap();
    let photo = write_file(&tmp, "notes.txt", b"definitely not a photo");
    let out = tmp.path().join("model.png");

    atelier()
        .args(["generate", "model", "--photo"])
        .arg(&photo)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("please select an image file"));
    assert!(!out.exists());
}

#[test]
fn generate_model_without_api_key_fails() {
    let tmp = TempDir::new().unwrap();
    let photo = write_file(&tmp, "me.png", PNG_BYTES);
    let out = tmp.path().join("model.png");

    atelier()
        .args(["generate", "model", "--photo"])
        .arg(&photo)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to create model"))
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
    assert!(!out.exists());
}

#[test]
fn generate_try_on_missing_garment_file_fails() {
    let tmp = TempDir::new().unwrap();
    let model = write_file(&tmp, "model.png", PNG_BYTES);

    atelier()
        .args(["generate", "try-on", "--model"])
        .arg(&model)
        .args(["--garment", "/nonexistent/coat.png", "--out"])
        .arg(tmp.path().join("out.png"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn generate_pose_out_of_range_fails() {
    let tmp = TempDir::new().unwrap();
    let image = write_file(&tmp, "model.png", PNG_BYTES);

    atelier()
        .args(["generate", "pose", "--image"])
        .arg(&image)
        .args(["--pose", "42", "--out"])
        .arg(tmp.path().join("out.png"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("pose index 42 is out of range"));
}

#[test]
fn generate_errors_as_json() {
    let tmp = TempDir::new().unwrap();
    let photo = write_file(&tmp, "notes.txt", b"text");

    let output = atelier()
        .args(["--output", "json", "--quiet", "generate", "model", "--photo"])
        .arg(&photo)
        .arg("--out")
        .arg(tmp.path().join("model.png"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("please select an image file"));
}

#[test]
fn quiet_suppresses_error_text() {
    let tmp = TempDir::new().unwrap();
    let photo = write_file(&tmp, "notes.txt", b"text");

    atelier()
        .args(["--quiet", "generate", "model", "--photo"])
        .arg(&photo)
        .arg("--out")
        .arg(tmp.path().join("model.png"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 5. Serve flags
// ──────────────────────────────────────────────

#[test]
fn serve_rejects_half_tls_configuration() {
    atelier()
        .args(["serve", "--port", "1", "--tls-cert", "cert.pem"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--tls-cert and --tls-key"));
}
