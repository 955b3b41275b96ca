//! Configuration loading and graceful degradation
//!
//! Uses serial_test: tests that touch SETLIST_CONFIG run sequentially.

use serial_test::serial;
use setlist_common::config::{
    load_toml_config, parse_toml_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR,
    DEFAULT_PORT,
};
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.database_path, PathBuf::from("setlist.db"));
    assert!(config.oracle_url.is_none());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("setlist.toml");
    std::fs::write(&path, "port = 6000\n").unwrap();

    let config = parse_toml_config(&path).unwrap();
    assert_eq!(config.port, 6000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_full_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("setlist.toml");
    std::fs::write(
        &path,
        r#"
database_path = "/srv/setlist/data.db"
port = 7001
oracle_url = "http://localhost:9000"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = parse_toml_config(&path).unwrap();
    assert_eq!(config.resolved_database_path(), PathBuf::from("/srv/setlist/data.db"));
    assert_eq!(config.oracle_url.as_deref(), Some("http://localhost:9000"));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_relative_database_path_uses_root_folder() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/data/setlist")),
        ..TomlConfig::default()
    };
    assert_eq!(
        config.resolved_database_path(),
        PathBuf::from("/data/setlist/setlist.db")
    );
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));
}

#[test]
#[serial]
fn test_env_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let config = load_toml_config(Some(Path::new("/definitely/not/here.toml")));
    assert_eq!(config.port, DEFAULT_PORT);
}

#[test]
#[serial]
fn test_malformed_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let config = load_toml_config(Some(&path));
    assert_eq!(config.port, DEFAULT_PORT);
}
