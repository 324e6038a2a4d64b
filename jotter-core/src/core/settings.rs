//! Application settings persistence for Jotter.
//!
//! Stores user preferences (database location, auto-save delay, logging) in a
//! JSON file at an OS-appropriate location.

use crate::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "jotter";

/// Persisted application settings.
///
/// Missing keys fall back to their defaults, so older settings files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// SQLite file holding the notes table.
    pub database_path: PathBuf,
    /// Quiet period after the last keystroke before auto-save fires.
    pub autosave_delay_ms: u64,
    /// Wipe all notes when the application starts.
    pub clear_on_startup: bool,
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub log_level: String,
    pub log_directory: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let data = data_directory();
        Self {
            database_path: data.join("notes.db"),
            autosave_delay_ms: 1000,
            clear_on_startup: false,
            log_level: "info".to_string(),
            log_directory: data.join("logs"),
        }
    }
}

impl Settings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

/// Returns the path to the settings JSON file.
///
/// - Linux: `~/.config/jotter/settings.json`
/// - macOS: `~/Library/Application Support/jotter/settings.json`
/// - Windows: `%APPDATA%/jotter/settings.json`
pub fn settings_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("settings.json")
}

/// Returns the per-user data directory that holds the database and logs.
pub fn data_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
        })
        .join(APP_DIR)
}

/// Loads settings from the default location; see [`load_settings_from`].
pub fn load_settings() -> Settings {
    load_settings_from(settings_file_path())
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_settings_from<P: AsRef<Path>>(path: P) -> Settings {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(
                "event=settings_load module=settings status=corrupt path={} error={e}",
                path.display()
            );
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

/// Saves settings to the default location, creating parent directories as needed.
pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings_file_path(), settings)
}

/// Saves settings to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`crate::JotterError::Io`] if the directory or file cannot be
/// written, or [`crate::JotterError::Json`] if serialization fails.
pub fn save_settings_to<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
