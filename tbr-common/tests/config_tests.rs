//! Unit tests for configuration loading and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate TBR_ROOT_FOLDER or TBR_CONFIG are marked with #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tbr_common::config::{
    config_file_path, load_toml_config, RootFolderInitializer, RootFolderResolver, TomlConfig,
    CONFIG_ENV_VAR, ROOT_FOLDER_ENV_VAR,
};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/from/env");

    let resolver = RootFolderResolver::new(
        Some(PathBuf::from("/from/cli")),
        Some(PathBuf::from("/from/toml")),
    );
    assert_eq!(resolver.resolve(), PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/from/env");

    let resolver = RootFolderResolver::new(None, Some(PathBuf::from("/from/toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/from/env"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_used_when_no_cli_or_env() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let resolver = RootFolderResolver::new(None, Some(PathBuf::from("/from/toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_default_root_folder_when_nothing_configured() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let resolved = RootFolderResolver::default().resolve();
    assert!(!resolved.as_os_str().is_empty());
    assert!(resolved.to_string_lossy().contains("travelblogr"));
}

#[test]
fn test_initializer_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("nested").join("root");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("travelblogr.db"));
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config: TomlConfig = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();

    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.redis_url.is_none());
}

#[test]
fn test_partial_config_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tbr-images.toml");
    std::fs::write(&path, "bind_address = \"0.0.0.0:9000\"\n").unwrap();

    let config: TomlConfig = load_toml_config(&path).unwrap();
    assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0:9000"));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "bind_address = [unterminated").unwrap();

    let result: tbr_common::Result<TomlConfig> = load_toml_config(&path);
    assert!(matches!(result, Err(tbr_common::Error::Config(_))));
}

#[test]
#[serial]
fn test_config_path_env_override() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/custom.toml");
    assert_eq!(
        config_file_path("tbr-images"),
        Some(PathBuf::from("/tmp/custom.toml"))
    );
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_config_path_default_uses_module_name() {
    env::remove_var(CONFIG_ENV_VAR);
    if let Some(path) = config_file_path("tbr-images") {
        assert!(path.ends_with("travelblogr/tbr-images.toml"));
    }
}
