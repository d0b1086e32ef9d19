//! Integration tests for Settings config loading.
//!
//! These tests run without a global config (temp directories only), so
//! `Settings::load` effectively layers the local file over the defaults.

use std::fs;

use tempfile::TempDir;

use treesheet::config::{local_config_path, Settings, EXCEL_MAX_COLS, EXCEL_MAX_ROWS};
use treesheet::errors::ConfigError;
use treesheet::{Attributes, Tree, Worksheet};

#[test]
fn given_partial_file_when_load_file_then_unspecified_keep_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[tree]\nseparator = \"::\"\n").unwrap();

    let settings = Settings::load_file(&path).expect("load settings");

    assert_eq!(settings.tree.separator, "::");
    assert_eq!(settings.sheet.max_rows, EXCEL_MAX_ROWS);
    assert_eq!(settings.sheet.max_cols, EXCEL_MAX_COLS);
}

#[test]
fn given_malformed_file_when_load_file_then_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[sheet\nmax_rows = ").unwrap();

    let err = Settings::load_file(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
}

#[test]
fn given_missing_file_when_load_file_then_read_error() {
    let dir = TempDir::new().unwrap();

    let err = Settings::load_file(&dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, ConfigError::Read { .. }));
}

/// Local file and env override run in one test: env vars are process-global.
#[test]
fn given_local_file_and_env_when_load_then_env_wins() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "[tree]\nseparator = \".\"\n[sheet]\nmax_rows = 100\nmax_cols = 20\n",
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");
    assert_eq!(settings.tree.separator, ".");
    assert_eq!(settings.sheet.max_rows, 100);
    assert_eq!(settings.sheet.max_cols, 20);

    std::env::set_var("TREESHEET__SHEET__MAX_ROWS", "7");
    let settings = Settings::load(Some(dir.path()));
    std::env::remove_var("TREESHEET__SHEET__MAX_ROWS");
    let settings = settings.expect("load settings");
    assert_eq!(settings.sheet.max_rows, 7);
    assert_eq!(settings.sheet.max_cols, 20);
}

#[test]
fn given_settings_when_applied_then_tree_and_sheet_follow_them() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[tree]\nseparator = \".\"\n[sheet]\nmax_rows = 4\nmax_cols = 4\n").unwrap();
    let settings = Settings::load_file(&path).unwrap();

    let mut tree: Tree = Tree::with_settings(&settings.tree);
    let a = tree.create("a", Attributes::new(), None).unwrap();
    let b = tree.create("b", Attributes::new(), Some(a)).unwrap();
    assert_eq!(tree.path_string(b).unwrap(), ".a.b");

    assert!(Worksheet::with_settings("s", 4, 4, &settings.sheet).is_ok());
    assert!(Worksheet::with_settings("s", 5, 4, &settings.sheet).is_err());
}

#[test]
fn given_defaults_when_to_toml_then_file_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, Settings::default().to_toml().unwrap()).unwrap();

    assert_eq!(Settings::load_file(&path).unwrap(), Settings::default());
}
