use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::DEFAULT_STORAGE_KEY;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage file; empty means the profile's data directory
    #[serde(default)]
    pub storage_path: String,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// chrono format string used to display reminder times
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
    /// Program called as `<command> <title> <body>` instead of the platform default
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_save")]
    pub save: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_help")]
    pub help: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_muted")]
    pub muted: String,
    #[serde(default = "default_accent")]
    pub accent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: String::new(),
            storage_key: default_storage_key(),
            time_format: default_time_format(),
            log_level: default_log_level(),
            notifications: NotificationSettings::default(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
            command: None,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new: default_new(),
            delete: default_delete(),
            save: default_save(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            help: default_help(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            muted: default_muted(),
            accent: default_accent(),
        }
    }
}

impl Theme {
    fn preset(fg: &str, bg: &str, highlight_bg: &str, muted: &str, accent: &str) -> Self {
        Self {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            muted: muted.to_string(),
            accent: accent.to_string(),
        }
    }

    /// Get preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();
        themes.insert("default".to_string(), Theme::default());
        themes.insert("light".to_string(), Theme::preset("black", "white", "blue", "gray", "magenta"));
        themes.insert("green".to_string(), Theme::preset("green", "black", "yellow", "darkgray", "lightgreen"));
        themes.insert("monochrome".to_string(), Theme::preset("white", "black", "white", "gray", "white"));
        themes
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_time_format() -> String {
    "%d/%m/%Y, %H:%M".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_notifications_enabled() -> bool {
    true
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_muted() -> String {
    "darkgray".to_string()
}

fn default_accent() -> String {
    "cyan".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load the profile's config file, creating it with defaults if missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        let mut config = Self::load_or_create(&config_path)?;
        config.resolve_storage_path(profile);
        Ok(config)
    }

    /// Load an explicit config file (`--config`); it must exist
    pub fn load_from_path(path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let mut config: Config = toml::from_str(&contents)?;
        config.resolve_storage_path(profile);
        Ok(config)
    }

    fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            Ok(toml::from_str(&contents)?)
        } else {
            let mut config = Config::default();
            config.save_to_path(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the given file, creating parent directories
    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    fn resolve_storage_path(&mut self, profile: utils::Profile) {
        if self.storage_path.trim().is_empty() {
            self.storage_path = Self::default_storage_path_for_profile(profile);
        }
    }

    fn default_storage_path_for_profile(profile: utils::Profile) -> String {
        match utils::get_data_dir(profile) {
            Some(data_dir) => data_dir.join("reminders.db").to_string_lossy().to_string(),
            None => match profile {
                utils::Profile::Dev => "~/.local/share/rmd-dev/reminders.db".to_string(),
                utils::Profile::Prod => "~/.local/share/rmd/reminders.db".to_string(),
            },
        }
    }

    /// Storage file path with `~` expanded
    pub fn get_storage_path(&self) -> PathBuf {
        utils::expand_path(&self.storage_path)
    }

    /// Currently active theme: user-defined first, then presets, then default
    pub fn get_active_theme(&self) -> Theme {
        self.themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_takes_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage_key, "reminders");
        assert_eq!(config.time_format, "%d/%m/%Y, %H:%M");
        assert!(config.notifications.enabled);
        assert_eq!(config.key_bindings.new, "n");
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            storage_key = "rmd"
            [notifications]
            enabled = false
            [key_bindings]
            quit = "x"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage_key, "rmd");
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.command, None);
        assert_eq!(config.key_bindings.quit, "x");
        assert_eq!(config.key_bindings.delete, "d");
    }

    #[test]
    fn save_and_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");
        let mut config = Config::default();
        config.storage_path = dir.path().join("r.db").to_string_lossy().to_string();
        config.current_theme = "light".to_string();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path, utils::Profile::Dev).unwrap();
        assert_eq!(loaded.storage_path, config.storage_path);
        assert_eq!(loaded.get_active_theme().bg, "white");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from_path(&dir.path().join("nope.toml"), utils::Profile::Dev);
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        let mut config = Config::default();
        config.current_theme = "neon".to_string();
        assert_eq!(config.get_active_theme().fg, "white");
        config.themes.insert("neon".to_string(), Theme::preset("magenta", "black", "cyan", "gray", "yellow"));
        assert_eq!(config.get_active_theme().fg, "magenta");
    }
}
