//! Configuration and identity from the environment

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;

use curriculum_sync::{ConfigError, Identity, SyncConfig, SyncError};

const VARS: [&str; 8] = [
    "CURRICULUM_REMOTE_URL",
    "CURRICULUM_COLLECTION",
    "CURRICULUM_DATA_DIR",
    "CURRICULUM_CACHE_TTL_SECS",
    "CURRICULUM_REQUEST_TIMEOUT_SECS",
    "CURRICULUM_AUTH_TOKEN",
    "CURRICULUM_USER_ID",
    "CURRICULUM_ADMIN",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = SyncConfig::from_env().unwrap();
    assert!(config.remote_url.is_none());
    assert_eq!(config.collection, "study_plans");
    assert_eq!(config.cache_ttl, Duration::from_secs(300));
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("CURRICULUM_REMOTE_URL", "https://sync.example.com");
    std::env::set_var("CURRICULUM_COLLECTION", "plans_v2");
    std::env::set_var("CURRICULUM_DATA_DIR", "/var/lib/curriculum");
    std::env::set_var("CURRICULUM_CACHE_TTL_SECS", "60");
    std::env::set_var("CURRICULUM_AUTH_TOKEN", "secret");

    let config = SyncConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.remote_url.as_deref(), Some("https://sync.example.com"));
    assert_eq!(config.collection, "plans_v2");
    assert_eq!(config.data_dir, PathBuf::from("/var/lib/curriculum"));
    assert_eq!(config.cache_ttl, Duration::from_secs(60));
    assert_eq!(config.auth_token.as_deref(), Some("secret"));
}

#[test]
#[serial]
fn test_from_env_bad_number() {
    clear_env();
    std::env::set_var("CURRICULUM_CACHE_TTL_SECS", "five minutes");
    let result = SyncConfig::from_env();
    clear_env();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidValue { key: "CURRICULUM_CACHE_TTL_SECS", .. })
    ));
}

#[test]
#[serial]
fn test_identity_from_env() {
    clear_env();
    let anonymous = Identity::from_env();
    assert_eq!(anonymous.user_id, "admin");
    assert!(!anonymous.is_privileged);
    crate::assert_err!(anonymous.require_privileged(), SyncError::Forbidden { .. });

    std::env::set_var("CURRICULUM_USER_ID", "tutor-7");
    std::env::set_var("CURRICULUM_ADMIN", "1");
    let admin = Identity::from_env();
    clear_env();

    assert_eq!(admin, Identity::new("tutor-7", true));
    crate::assert_ok!(admin.require_privileged());
}

#[test]
fn test_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curriculum.toml");
    std::fs::write(&path, "remote_url = \"http://localhost:8080\"\nrequest_timeout_secs = 5\n").unwrap();

    let config = SyncConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.remote_base(), Some("http://localhost:8080"));
    assert_eq!(config.request_timeout, Duration::from_secs(5));

    assert!(matches!(
        SyncConfig::from_toml_file(dir.path().join("missing.toml")),
        Err(ConfigError::Io(_))
    ));
}
