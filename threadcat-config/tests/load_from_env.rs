//! Layered configuration resolution from the process environment.

use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tempfile::tempdir;
use threadcat_config::models::{CONFIG_JSON_ENV, CONFIG_PATH_ENV, DATA_DIR_ENV};
use threadcat_config::{Config, ConfigSource};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn clear_env() {
    for key in [CONFIG_PATH_ENV, CONFIG_JSON_ENV, DATA_DIR_ENV] {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
fn explicit_path_wins_over_inline_json() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_env();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[query]\nsample_size = 3\n").expect("write config");
    unsafe {
        std::env::set_var(CONFIG_PATH_ENV, &path);
        std::env::set_var(CONFIG_JSON_ENV, r#"{"query": {"sample_size": 8}}"#);
    }

    let (config, source) = Config::load_from_env().expect("load");

    assert_eq!(config.query.sample_size, 3);
    assert_eq!(source, ConfigSource::EnvPath(path));
    clear_env();
}

#[test]
fn inline_json_is_used_without_a_path() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_env();
    unsafe { std::env::set_var(CONFIG_JSON_ENV, r#"{"batch": {"max_parallel_chats": 4}}"#) };

    let (config, source) = Config::load_from_env().expect("load");

    assert_eq!(config.batch.max_parallel_chats, 4);
    assert_eq!(source, ConfigSource::EnvInline);
    clear_env();
}

#[test]
fn malformed_inline_json_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_env();
    unsafe { std::env::set_var(CONFIG_JSON_ENV, "{ nope") };

    let err = Config::load_from_env().expect_err("invalid json");

    assert!(err.to_string().contains("THREADCAT_CONFIG_JSON"));
    clear_env();
}

#[test]
fn data_dir_override_applies_after_loading() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_env();
    unsafe {
        std::env::set_var(CONFIG_JSON_ENV, r#"{"storage": {"data_dir": "/from/json"}}"#);
        std::env::set_var(DATA_DIR_ENV, "/from/env");
    }

    let load = Config::load().expect("load");

    assert_eq!(load.config.storage.data_dir, PathBuf::from("/from/env"));
    assert_eq!(
        load.config.storage.paths().taxonomy,
        PathBuf::from("/from/env").join("tag.json")
    );
    clear_env();
}

#[test]
fn invalid_settings_fail_validation() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_env();
    unsafe { std::env::set_var(CONFIG_JSON_ENV, r#"{"sync": {"topic_page_size": 0}}"#) };

    assert!(Config::load().is_err());
    clear_env();
}
