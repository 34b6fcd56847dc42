//! Runs the `rhp12rn` binary end to end.

use std::path::PathBuf;
use std::process::{Command, Output};

fn rhp12rn(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rhp12rn"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run rhp12rn")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf-8 stdout")
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rhp12rn-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn test_read_model_number() {
    let output = rhp12rn(&["read", "model_number"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "model_number = 35074\n");
}

#[test]
fn test_write_signed_value() {
    let output = rhp12rn(&["write", "goal_current", "-50"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output), "goal_current <- -50\n");
}

#[test]
fn test_status() {
    let output = rhp12rn(&["status"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("present_position: 0"));
    assert!(text.contains("moving: false"));
}

#[test]
fn test_fields_listing() {
    let output = rhp12rn(&["--model", "rn", "fields"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("model_number @ 0 (u16, r)"));
    assert!(text.contains("goal_current"));
}

#[test]
fn test_unknown_field_fails() {
    let output = rhp12rn(&["read", "goal_torque"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown field: goal_torque"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_config_file() {
    let config = temp_file("config.yaml", "bus_id: 7\nbaud_rate: 1000000\n");
    let output = rhp12rn(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "read",
        "id",
    ]);
    std::fs::remove_file(&config).ok();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "id = 1\n");
}

#[test]
fn test_fields_file() {
    let fields = temp_file(
        "fields.yaml",
        "- address: 0\n  data_type: u16\n  name: model_number\n",
    );
    let output = rhp12rn(&[
        "--fields",
        fields.to_str().expect("utf-8 path"),
        "read",
        "model_number",
    ]);
    std::fs::remove_file(&fields).ok();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "model_number = 35074\n");
}

#[test]
fn test_missing_config_file() {
    let output = rhp12rn(&["--config", "/nonexistent/rhp12rn.yaml", "identify"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}
