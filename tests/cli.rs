use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn tds2stac_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tds2stac"))
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(tds2stac_binary())
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run tds2stac")
}

#[test]
fn help_lists_commands() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("harvest"));
    assert!(stdout.contains("count"));
}

#[test]
fn harvest_requires_url() {
    let output = run(&["harvest"]);
    assert!(!output.status.success());
}

#[test]
fn invalid_progress_mode_rejected() {
    let output = run(&["count", "http://127.0.0.1:9/catalog.xml", "--progress", "loud"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loud"));
}

#[test]
fn invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("tds2stac.toml");
    fs::write(&config, "[http]\ntimeout_secs = 0\n").unwrap();

    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "count",
        "http://127.0.0.1:9/catalog.xml",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timeout_secs"));
}

#[test]
fn unreachable_root_writes_lone_catalog() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("tds2stac.toml");
    fs::write(&config, "[http]\ntimeout_secs = 5\n").unwrap();
    let out = tmp.path().join("stac");

    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "harvest",
        "http://127.0.0.1:9/thredds/catalog.xml",
        "--out",
        out.to_str().unwrap(),
        "--progress",
        "off",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("catalogs created: 1"));
    assert!(stdout.contains("unreachable catalogs: 1"));
    assert!(stdout.trim_end().ends_with("ok"));
    assert!(out.join("catalog.json").exists());
}
