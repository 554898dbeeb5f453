#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::{Command, Output};

fn missing_port(tag: &str) -> PathBuf {
    PathBuf::from(format!(
        "/tmp/radiolink-missing-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

fn radiolink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_radiolink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("RADIOLINK_PORT")
        .env_remove("RADIOLINK_ROLE")
        .env_remove("RADIOLINK_VARIANT")
        .env_remove("RADIOLINK_BANDWIDTH")
        .env_remove("RADIOLINK_BAUD")
        .output()
        .expect("radiolink should run")
}

#[test]
fn version_prints_package_version() {
    let output = radiolink(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("radiolink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_features() {
    let output = radiolink(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: radiolink"));
    assert!(stdout.contains("cli=true"));
}

#[test]
fn send_to_missing_port_returns_3() {
    let port = missing_port("send");
    let output = radiolink(&[
        "send",
        "--port",
        port.to_str().expect("utf8 path"),
        "--data",
        "hello",
    ]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configure failed"));
}

#[test]
fn run_against_missing_port_returns_3() {
    let port = missing_port("run");
    let output = radiolink(&[
        "--format",
        "json",
        "run",
        "--port",
        port.to_str().expect("utf8 path"),
    ]);

    assert_eq!(output.status.code(), Some(3));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"content\":\"service\""));
}

#[test]
fn invalid_hex_payload_returns_64() {
    let output = radiolink(&["send", "--hex", "zz"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn zero_interval_returns_64() {
    let output = radiolink(&["send", "--data", "x", "--interval", "0s"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn oversized_interval_returns_64_before_opening_port() {
    let port = missing_port("interval");
    let output = radiolink(&[
        "send",
        "--port",
        port.to_str().expect("utf8 path"),
        "--data",
        "x",
        "--interval",
        "18446744073709551615s",
    ]);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("master_interval"));
}

#[test]
fn ports_json_is_an_array() {
    let output = radiolink(&["--format", "json", "ports"]);
    if !output.status.success() {
        // Port enumeration is unavailable in some sandboxes.
        assert_eq!(output.status.code(), Some(3));
        return;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("ports output should be JSON");
    assert!(value.is_array());
}
