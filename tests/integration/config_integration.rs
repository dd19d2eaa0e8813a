//! Integration tests for configuration loading into a running store.

use niwa::cli::{Commands, RunContext};
use niwa::config::{ConfigLoader, NiwaConfig, WaitPolicyKind, CONFIG_DIR};
use niwa::store::WaitPolicy;
use niwa::{Niwa, NiwaError};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_workspace_config_moves_store() {
    let workspace = TempDir::new().unwrap();
    let config_dir = workspace.path().join(CONFIG_DIR);
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[store]\npath = \"data/db\"\nlock_timeout_ms = 250\n",
    )
    .unwrap();

    let context = RunContext::new(workspace.path().to_path_buf(), None).unwrap();
    context.execute(&Commands::Init).unwrap();

    assert!(workspace.path().join("data/db").exists());
    assert_eq!(
        context.niwa().store().options().wait_policy,
        WaitPolicy::Wait(Duration::from_millis(250))
    );
}

#[test]
fn test_explicit_config_file_written_with_toml() {
    let workspace = TempDir::new().unwrap();
    let mut config = NiwaConfig::default();
    config.store.write_retries = 9;
    config.store.wait_policy = WaitPolicyKind::FailFast;
    config.registry.stale_after_days = 7;

    let path = workspace.path().join("niwa.toml");
    fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(loaded.store.write_retries, 9);
    assert_eq!(loaded.store.wait_policy, WaitPolicyKind::FailFast);
    assert_eq!(loaded.registry.stale_after_days, 7);
}

#[test]
fn test_init_writes_default_config_once() {
    let workspace = TempDir::new().unwrap();
    let context = RunContext::new(workspace.path().to_path_buf(), None).unwrap();

    let first = context.execute(&Commands::Init).unwrap();
    assert!(first.contains("Wrote default config"));
    let second = context.execute(&Commands::Init).unwrap();
    assert!(!second.contains("Wrote default config"));
    assert!(second.contains("already exists"));

    let written = workspace.path().join(CONFIG_DIR).join("config.toml");
    let reloaded = ConfigLoader::load_from_file(&written).unwrap();
    assert_eq!(reloaded.store, NiwaConfig::default().store);
}

#[test]
fn test_invalid_config_is_rejected_on_open() {
    let workspace = TempDir::new().unwrap();
    let mut config = NiwaConfig::default();
    config.registry.stale_after_days = 0;
    let err = Niwa::open(workspace.path(), &config).err().unwrap();
    assert!(matches!(err, NiwaError::ConfigError(_)));
}

#[test]
fn test_fail_fast_policy_reaches_store() {
    let workspace = TempDir::new().unwrap();
    let mut config = NiwaConfig::default();
    config.store.wait_policy = WaitPolicyKind::FailFast;
    let niwa = Niwa::open(workspace.path(), &config).unwrap();
    niwa.init().unwrap();
    assert_eq!(niwa.store().options().wait_policy, WaitPolicy::FailFast);
}
