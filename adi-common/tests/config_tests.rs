//! Configuration resolution tests
//!
//! Tests touching `ADI_CONFIG` are marked #[serial] so they do not race on
//! the process environment.

use adi_common::config::{
    load_toml_config, locate_config_file, write_toml_config, ConfigOverrides, HttpConfig,
    TomlConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE_NAME,
};
use adi_common::{CensusYear, Error, RunConfig};
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_defaults_resolve_against_work_dir() {
    let dir = TempDir::new().unwrap();
    let work = dir.path().to_path_buf();

    let config = RunConfig::from_parts(
        ConfigOverrides::default(),
        TomlConfig::default(),
        work.clone(),
        None,
    )
    .unwrap();

    assert_eq!(config.work_dir, work);
    assert_eq!(config.census_year, CensusYear::default());
    assert_eq!(config.addresses_file, work.join("addresses.csv"));
    assert_eq!(config.secrets_file, work.join("secrets.json"));
    assert_eq!(config.reference_dir, work.join("adi-data"));
    assert_eq!(config.output_dir, work);
    assert_eq!(config.http, HttpConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_cli_overrides_toml() {
    let dir = TempDir::new().unwrap();
    let toml_config: TomlConfig = toml::from_str(
        r#"
        census_year = 2020
        output_dir = "results"
        reference_dir = "/data/adi"

        [logging]
        level = "warn"
        file = "run.log"
        "#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        census_year: Some(CensusYear::new(2010).unwrap()),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };
    let config =
        RunConfig::from_parts(overrides, toml_config, dir.path().to_path_buf(), None).unwrap();

    assert_eq!(config.census_year.get(), 2010);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.output_dir, dir.path().join("results"));
    assert_eq!(config.reference_dir, PathBuf::from("/data/adi"));
    assert_eq!(config.logging.file, Some(dir.path().join("run.log")));
}

#[test]
fn test_toml_work_dir_relative_to_cli_dir() {
    let dir = TempDir::new().unwrap();
    let toml_config: TomlConfig = toml::from_str(r#"work_dir = "batch""#).unwrap();

    let config = RunConfig::from_parts(
        ConfigOverrides::default(),
        toml_config,
        dir.path().to_path_buf(),
        None,
    )
    .unwrap();

    assert_eq!(config.work_dir, dir.path().join("batch"));
    assert_eq!(config.addresses_file, dir.path().join("batch").join("addresses.csv"));
}

#[test]
fn test_http_table_sets_request_pacing() {
    let dir = TempDir::new().unwrap();
    let toml_config: TomlConfig = toml::from_str(
        "[http]\nrequest_interval_ms = 250\nrequest_jitter_ms = 0\n",
    )
    .unwrap();

    let config = RunConfig::from_parts(
        ConfigOverrides::default(),
        toml_config,
        dir.path().to_path_buf(),
        None,
    )
    .unwrap();

    assert_eq!(config.http.request_interval_ms, 250);
    assert_eq!(config.http.request_jitter_ms, 0);
    assert_eq!(config.http.request_timeout_secs, 30);
}

#[test]
fn test_zero_timeout_rejected() {
    let dir = TempDir::new().unwrap();
    let toml_config: TomlConfig = toml::from_str("[http]\nrequest_timeout_secs = 0\n").unwrap();

    let result = RunConfig::from_parts(
        ConfigOverrides::default(),
        toml_config,
        dir.path().to_path_buf(),
        None,
    );

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unsupported_year_in_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE_NAME);
    fs::write(&path, "census_year = 1990\n").unwrap();

    assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));
}

#[test]
fn test_write_then_load_preserves_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE_NAME);
    let config = TomlConfig {
        census_year: Some(CensusYear::new(2010).unwrap()),
        output_dir: Some(PathBuf::from("out")),
        ..Default::default()
    };

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded.census_year, config.census_year);
    assert_eq!(loaded.output_dir, config.output_dir);
    assert!(!dir.path().join("nested").join("adi-enrich.toml.tmp").exists());
}

#[test]
#[serial]
fn test_config_file_in_work_dir_is_found() {
    std::env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(DEFAULT_CONFIG_FILE_NAME),
        "census_year = 2010\n",
    )
    .unwrap();

    let config = RunConfig::resolve(ConfigOverrides {
        work_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.census_year.get(), 2010);
    assert_eq!(
        config.source,
        Some(dir.path().join(DEFAULT_CONFIG_FILE_NAME))
    );
}

#[test]
#[serial]
fn test_env_config_path_wins_over_work_dir_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(DEFAULT_CONFIG_FILE_NAME), "census_year = 2020\n").unwrap();
    let other = dir.path().join("other.toml");
    fs::write(&other, "census_year = 2010\n").unwrap();
    std::env::set_var(CONFIG_ENV_VAR, &other);

    let found = locate_config_file(None, dir.path()).unwrap();

    std::env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(found, Some(other));
}

#[test]
#[serial]
fn test_explicit_missing_config_is_error() {
    std::env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();

    let result = locate_config_file(Some(&dir.path().join("missing.toml")), dir.path());

    assert!(matches!(result, Err(Error::Config(_))));
}
