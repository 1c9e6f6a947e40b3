//! Tests for data root resolution priority
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate CURTAIN_ROOT_FOLDER or CURTAIN_CONFIG are marked
//! with #[serial] so they run sequentially.

use curtain_common::config::{
    default_root_folder, locate_config_file, resolve_root_folder, CONFIG_FILE_ENV,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
#[serial]
fn test_env_var_beats_config_file() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let path = resolve_root_folder(None, ROOT_FOLDER_ENV, Some(Path::new("/tmp/from-toml")));
    assert_eq!(path, PathBuf::from("/tmp/from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_cli_beats_env_var() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let path = resolve_root_folder(Some(Path::new("/tmp/from-cli")), ROOT_FOLDER_ENV, None);
    assert_eq!(path, PathBuf::from("/tmp/from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let path = resolve_root_folder(None, ROOT_FOLDER_ENV, None);
    assert_eq!(path, default_root_folder());
    assert!(path.to_string_lossy().contains("curtain"));
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");

    let path = resolve_root_folder(None, ROOT_FOLDER_ENV, Some(Path::new("/tmp/from-toml")));
    assert_eq!(path, PathBuf::from("/tmp/from-toml"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_config_file_from_env() {
    env::set_var(CONFIG_FILE_ENV, "/tmp/curtain-test.toml");

    assert_eq!(
        locate_config_file(None),
        Some(PathBuf::from("/tmp/curtain-test.toml"))
    );
    assert_eq!(
        locate_config_file(Some(Path::new("/tmp/explicit.toml"))),
        Some(PathBuf::from("/tmp/explicit.toml"))
    );

    env::remove_var(CONFIG_FILE_ENV);
}
