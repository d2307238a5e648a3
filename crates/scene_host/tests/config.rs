use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scene_host::config::{config_path_from, ConfigError, HostConfig, LogDestination};
use scene_host::logging::parse_level;
use tempfile::TempDir;

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|arg| arg.to_string()).collect()
}

#[test]
fn partial_file_keeps_remaining_defaults() {
    let config = HostConfig::parse(
        r#"(
    submit_ack_timeout_secs: 5,
    generation_timeout_secs: 0,
    log: (destination: Both, level: "debug"),
    download: (max_bytes: 1024),
)"#,
    )
    .unwrap();

    let defaults = HostConfig::default();
    assert_eq!(config.submit_ack_timeout(), Duration::from_secs(5));
    assert_eq!(config.log.destination, LogDestination::Both);
    assert_eq!(config.log.file, defaults.log.file);
    assert_eq!(config.output_root, defaults.output_root);
    assert_eq!(config.deadlines().generation, Duration::from_secs(1));
    assert_eq!(config.deadlines().download, Duration::from_secs(120));

    let download = config.download_settings();
    assert_eq!(download.max_bytes, 1024);
    assert_eq!(download.connect_timeout, Duration::from_secs(10));
}

#[test]
fn load_without_path_uses_defaults() {
    assert_eq!(HostConfig::load(None).unwrap(), HostConfig::default());
}

#[test]
fn load_reports_missing_and_malformed_files() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent.ron");
    assert!(matches!(
        HostConfig::load(Some(&missing)),
        Err(ConfigError::Read { .. })
    ));

    let broken = temp.path().join("broken.ron");
    fs::write(&broken, "(submit_ack_timeout_secs: \"soon\")").unwrap();
    assert!(matches!(
        HostConfig::load(Some(&broken)),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn config_path_prefers_arguments_over_environment() {
    let env = Some(OsString::from("/etc/scene/env.ron"));
    assert_eq!(
        config_path_from(args(&["--config", "/tmp/a.ron"]), env.clone()),
        Some(PathBuf::from("/tmp/a.ron"))
    );
    assert_eq!(
        config_path_from(args(&["chrome-extension://abc/", "--config=/tmp/b.ron"]), env.clone()),
        Some(PathBuf::from("/tmp/b.ron"))
    );
    assert_eq!(
        config_path_from(args(&["chrome-extension://abc/"]), env),
        Some(PathBuf::from("/etc/scene/env.ron"))
    );
    assert_eq!(
        config_path_from(args(&["--config"]), Some(OsString::new())),
        None
    );
}

#[test]
fn unknown_log_level_falls_back_to_info() {
    assert_eq!(parse_level("DEBUG"), log::LevelFilter::Debug);
    assert_eq!(parse_level(" warn "), log::LevelFilter::Warn);
    assert_eq!(parse_level("chatty"), log::LevelFilter::Info);
}
