//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treesheet/treesheet.toml`
//! 3. Local config: `<dir>/.treesheet.toml`
//! 4. Environment variables: `TREESHEET__*` (e.g. `TREESHEET__TREE__SEPARATOR`)

use std::path::{Path, PathBuf};

use config::{Config, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{ConfigError, ConfigResult};

/// Excel's sheet limits.
pub const EXCEL_MAX_ROWS: u32 = 1_048_576;
pub const EXCEL_MAX_COLS: u32 = 16_384;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeSettings {
    /// Joins node names in path strings
    pub separator: String,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            separator: "/".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SheetSettings {
    /// Upper bound for worksheet rows and A1 row numbers
    pub max_rows: u32,
    /// Upper bound for worksheet columns and A1 column letters
    pub max_cols: u32,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            max_rows: EXCEL_MAX_ROWS,
            max_cols: EXCEL_MAX_COLS,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub tree: RawTreeSettings,
    pub sheet: RawSheetSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawTreeSettings {
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSheetSettings {
    pub max_rows: Option<u32>,
    pub max_cols: Option<u32>,
}

/// Unified configuration for treesheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub tree: TreeSettings,
    pub sheet: SheetSettings,
}

/// Get the XDG config directory for treesheet.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treesheet").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treesheet.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".treesheet.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> ConfigResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl Settings {
    /// Scalar overlay: values present in `overlay` win.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            tree: TreeSettings {
                separator: overlay
                    .tree
                    .separator
                    .clone()
                    .unwrap_or_else(|| self.tree.separator.clone()),
            },
            sheet: SheetSettings {
                max_rows: overlay.sheet.max_rows.unwrap_or(self.sheet.max_rows),
                max_cols: overlay.sheet.max_cols.unwrap_or(self.sheet.max_cols),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.treesheet.toml`
    #[instrument(level = "debug")]
    pub fn load(local_dir: Option<&Path>) -> ConfigResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "applying global config");
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!(path = %local_path.display(), "applying local config");
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current.apply_env_overrides()
    }

    /// Load from exactly one file on top of the defaults, ignoring global
    /// config and environment.
    #[instrument(level = "debug")]
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        Ok(Self::default().merge_with(&load_raw_settings(path)?))
    }

    /// Apply TREESHEET__* environment variables as explicit overrides.
    fn apply_env_overrides(mut self) -> ConfigResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("TREESHEET").prefix_separator("__").separator("__"))
            .build()?;

        if let Ok(val) = config.get_string("tree.separator") {
            self.tree.separator = val;
        }
        if let Ok(val) = config.get::<u32>("sheet.max_rows") {
            self.sheet.max_rows = val;
        }
        if let Ok(val) = config.get::<u32>("sheet.max_cols") {
            self.sheet.max_cols = val;
        }
        Ok(self)
    }

    /// Effective settings as TOML, suitable for a config file.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.tree.separator, "/");
        assert_eq!(settings.sheet.max_rows, EXCEL_MAX_ROWS);
        assert_eq!(settings.sheet.max_cols, EXCEL_MAX_COLS);
    }

    #[test]
    fn test_merge_keeps_unspecified() {
        let raw: RawSettings = toml::from_str("[sheet]\nmax_rows = 10\n").unwrap();
        let merged = Settings::default().merge_with(&raw);
        assert_eq!(merged.sheet.max_rows, 10);
        assert_eq!(merged.sheet.max_cols, EXCEL_MAX_COLS);
        assert_eq!(merged.tree.separator, "/");
    }

    #[test]
    fn test_to_toml_round_trips_through_raw() {
        let rendered = Settings::default().to_toml().unwrap();
        let raw: RawSettings = toml::from_str(&rendered).unwrap();
        assert_eq!(raw.tree.separator.as_deref(), Some("/"));
    }
}
