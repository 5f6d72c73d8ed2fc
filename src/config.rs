// src/config.rs

//! Persisted user settings.
//!
//! User settings live in `~/.scoopi/config.toml` as a partial
//! [`SettingsLayer`]; anything not stored there falls back to the built-in
//! defaults. Invocation overrides are layered on top by the caller.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{SETTING_KEYS, Settings, SettingsLayer};
use crate::utils::fs::{load_toml, save_toml};

/// Directory under the home directory holding the settings file.
pub const CONFIG_DIR: &str = ".scoopi";
pub const CONFIG_FILE: &str = "config.toml";

/// Effective value of one setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingValue {
    pub key: String,
    pub value: String,
    /// Whether the value comes from the user settings file.
    pub customized: bool,
}

/// Reads and writes the user settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at `~/.scoopi/config.toml`.
    pub fn open_default() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::config("Cannot determine the home directory"))?;
        Ok(Self::at(home.join(CONFIG_DIR).join(CONFIG_FILE)))
    }

    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load user settings. A missing file yields an empty layer.
    pub fn load(&self) -> Result<SettingsLayer> {
        if !self.exists() {
            return Ok(SettingsLayer::default());
        }
        load_toml(&self.path)
    }

    /// Load user settings or return an empty layer if loading fails.
    pub fn load_or_default(&self) -> SettingsLayer {
        self.load().unwrap_or_else(|e| {
            log::warn!(
                "Settings load failed from {:?}: {}. Using defaults.",
                self.path,
                e
            );
            SettingsLayer::default()
        })
    }

    pub fn save(&self, layer: &SettingsLayer) -> Result<()> {
        save_toml(&self.path, layer)?;
        log::debug!("Saved {} setting(s) to {}", layer.len(), self.path.display());
        Ok(())
    }

    /// Load user settings, reporting a malformed file as a configuration
    /// error instead of falling back.
    pub fn load_strict(&self) -> Result<SettingsLayer> {
        self.load().map_err(|e| {
            AppError::config(format!(
                "Invalid settings file {}: {e}. Fix it or run `scoopi config reset`.",
                self.path.display()
            ))
        })
    }

    /// Merge defaults, user settings and `overrides`, then validate.
    pub fn effective(&self, overrides: &SettingsLayer) -> Result<Settings> {
        Settings::resolve(&[&self.load_strict()?, overrides])
    }

    /// Parse, validate and persist a single setting.
    ///
    /// Returns the display form of the stored value. Nothing is written if
    /// the key is unknown or the value is rejected.
    pub fn set(&self, key: &str, raw: &str) -> Result<String> {
        let mut layer = self.load_strict()?;
        layer.set_raw(key, raw)?;

        let merged = Settings::resolve(&[&layer])?;
        self.save(&layer)?;

        merged
            .get(key)
            .ok_or_else(|| AppError::config(format!("Unknown configuration key: {key}")))
    }

    /// Effective value of `key` and whether the user customized it.
    pub fn get(&self, key: &str) -> Result<SettingValue> {
        let layer = self.load_or_default();
        let settings = Settings::resolve(&[&layer])?;
        let value = settings
            .get(key)
            .ok_or_else(|| AppError::config(format!("Unknown configuration key: {key}")))?;

        Ok(SettingValue {
            key: key.to_string(),
            value,
            customized: layer.is_set(key),
        })
    }

    /// Every setting grouped by category, in display order.
    pub fn entries(&self) -> Result<Vec<(&'static str, Vec<SettingValue>)>> {
        let layer = self.load_or_default();
        let settings = Settings::resolve(&[&layer])?;

        Ok(SETTING_KEYS
            .iter()
            .map(|(category, keys)| {
                let values = keys
                    .iter()
                    .filter_map(|key| {
                        settings.get(key).map(|value| SettingValue {
                            key: key.to_string(),
                            value,
                            customized: layer.is_set(key),
                        })
                    })
                    .collect();
                (*category, values)
            })
            .collect())
    }

    /// Clear all user settings. Returns `false` when there was no file.
    pub fn reset(&self) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        self.save(&SettingsLayer::default())?;
        Ok(true)
    }

    /// Available keys grouped by category.
    pub fn keys() -> &'static [(&'static str, &'static [&'static str])] {
        SETTING_KEYS
    }
}
