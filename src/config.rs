use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file; empty means the profile's data directory
    #[serde(default)]
    pub database_path: String,
    /// Local profile whose todos are shown and changed
    #[serde(default = "default_user")]
    pub user: String,
    /// How long a write waits for another writer before failing as busy
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Filter directive used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file; empty means the profile's data directory
    #[serde(default)]
    pub log_file: String,
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width_percent: u16,
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
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new_todo")]
    pub new_todo: String,
    #[serde(default = "default_new_category")]
    pub new_category: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_toggle_completed")]
    pub toggle_completed: String,
    #[serde(default = "default_cycle_priority")]
    pub cycle_priority: String,
    #[serde(default = "default_edit_memo")]
    pub edit_memo: String,
    #[serde(default = "default_filter_priority")]
    pub filter_priority: String,
    #[serde(default = "default_open")]
    pub open: String,
    #[serde(default = "default_back")]
    pub back: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_switch_pane")]
    pub switch_pane: String,
    #[serde(default = "default_cycle_theme")]
    pub cycle_theme: String,
    #[serde(default = "default_help")]
    pub help: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    /// Border of the folder under a dragged todo
    #[serde(default = "default_drop_target")]
    pub drop_target: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            user: default_user(),
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: default_log_level(),
            log_file: String::new(),
            sidebar_width_percent: default_sidebar_width(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new_todo: default_new_todo(),
            new_category: default_new_category(),
            delete: default_delete(),
            toggle_completed: default_toggle_completed(),
            cycle_priority: default_cycle_priority(),
            edit_memo: default_edit_memo(),
            filter_priority: default_filter_priority(),
            open: default_open(),
            back: default_back(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            switch_pane: default_switch_pane(),
            cycle_theme: default_cycle_theme(),
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
            highlight_fg: default_highlight_fg(),
            drop_target: default_drop_target(),
        }
    }
}

impl Theme {
    fn preset(fg: &str, bg: &str, highlight_bg: &str, highlight_fg: &str, drop_target: &str) -> Self {
        Self {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            highlight_fg: highlight_fg.to_string(),
            drop_target: drop_target.to_string(),
        }
    }

    /// Get preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();
        themes.insert("default".to_string(), Theme::default());
        themes.insert("dark".to_string(), Theme::preset("white", "black", "cyan", "black", "yellow"));
        themes.insert("light".to_string(), Theme::preset("black", "white", "blue", "white", "magenta"));
        themes.insert("green".to_string(), Theme::preset("green", "black", "yellow", "black", "cyan"));
        // empty highlight_fg is derived from highlight_bg
        themes.insert("monochrome".to_string(), Theme::preset("white", "black", "white", "", "white"));
        themes
    }
}

// Default value functions
fn default_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "me".to_string())
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sidebar_width() -> u16 {
    30
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new_todo() -> String {
    "n".to_string()
}

fn default_new_category() -> String {
    "c".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_toggle_completed() -> String {
    "Space".to_string()
}

fn default_cycle_priority() -> String {
    "p".to_string()
}

fn default_edit_memo() -> String {
    "m".to_string()
}

fn default_filter_priority() -> String {
    "f".to_string()
}

fn default_open() -> String {
    "Enter".to_string()
}

fn default_back() -> String {
    "Backspace".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_switch_pane() -> String {
    "Tab".to_string()
}

fn default_cycle_theme() -> String {
    "F2".to_string()
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

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_drop_target() -> String {
    "yellow".to_string()
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
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),
}

impl Config {
    /// Load configuration from the profile's config file, or create it with defaults
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from `path`, writing defaults there when it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
            Ok(toml::from_str(&contents)?)
        } else {
            let mut config = Config::default();
            config.save_to_path(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`
    pub fn save_to_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Expanded database path, falling back to the profile's data directory
    pub fn database_path(&self, profile: utils::Profile) -> PathBuf {
        Self::resolve_in_data_dir(&self.database_path, profile, "todos.db")
    }

    /// Expanded log file path, falling back to the profile's data directory
    pub fn log_path(&self, profile: utils::Profile) -> PathBuf {
        Self::resolve_in_data_dir(&self.log_file, profile, "todofold.log")
    }

    fn resolve_in_data_dir(configured: &str, profile: utils::Profile, file_name: &str) -> PathBuf {
        if !configured.trim().is_empty() {
            return utils::expand_path(configured.trim());
        }
        utils::get_data_dir(profile)
            .map(|dir| dir.join(file_name))
            .unwrap_or_else(|| PathBuf::from(file_name))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Get the currently active theme
    /// If highlight_fg is empty, it is calculated from highlight_bg
    pub fn get_active_theme(&self) -> Theme {
        use crate::tui::widgets::color::{format_color_for_display, get_contrast_text_color, parse_color};

        let mut theme = self
            .themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default();

        if theme.highlight_fg.is_empty() {
            let calculated_fg = get_contrast_text_color(parse_color(&theme.highlight_bg));
            theme.highlight_fg = format_color_for_display(&calculated_fg);
        }

        theme
    }

    /// Set the active theme by name
    pub fn set_theme(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.themes.contains_key(name) && !Theme::get_preset_themes().contains_key(name) {
            return Err(ConfigError::ThemeNotFound(name.to_string()));
        }
        self.current_theme = name.to_string();
        Ok(())
    }

    /// Get all available theme names (presets + user-defined), sorted
    pub fn get_available_themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = Theme::get_preset_themes().into_keys().collect();
        for theme_name in self.themes.keys() {
            if !themes.contains(theme_name) {
                themes.push(theme_name.clone());
            }
        }
        themes.sort();
        themes
    }

    /// Name of the theme after the current one, wrapping around
    pub fn next_theme(&self) -> String {
        let themes = self.get_available_themes();
        let next = themes
            .iter()
            .position(|name| *name == self.current_theme)
            .map(|i| (i + 1) % themes.len())
            .unwrap_or(0);
        themes
            .get(next)
            .cloned()
            .unwrap_or_else(default_current_theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            user = "alice"
            busy_timeout_ms = 250

            [key_bindings]
            quit = "Ctrl+q"
            "#,
        )
        .unwrap();

        assert_eq!(config.user, "alice");
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.key_bindings.quit, "Ctrl+q");
        assert_eq!(config.key_bindings.new_todo, "n");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.sidebar_width_percent, 30);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_from_path(&path).unwrap();
        assert!(path.exists());

        let reloaded = Config::load_from_path(&path).unwrap();
        assert_eq!(reloaded.user, created.user);
        assert_eq!(reloaded.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "busy_timeout_ms = \"soon\"").unwrap();
        assert!(matches!(Config::load_from_path(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn explicit_paths_win_over_data_dir() {
        let config = Config {
            database_path: "/tmp/todofold/todos.db".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.database_path(utils::Profile::Dev),
            PathBuf::from("/tmp/todofold/todos.db")
        );
        assert!(config.log_path(utils::Profile::Dev).ends_with("todofold.log"));
    }

    #[test]
    fn themes_cycle_and_reject_unknown_names() {
        let mut config = Config::default();
        assert!(matches!(config.set_theme("neon"), Err(ConfigError::ThemeNotFound(_))));

        let names = config.get_available_themes();
        let mut seen = Vec::new();
        for _ in 0..names.len() {
            let next = config.next_theme();
            config.set_theme(&next).unwrap();
            seen.push(next);
        }
        seen.sort();
        assert_eq!(seen, names);
    }

    #[test]
    fn empty_highlight_fg_is_derived() {
        let mut config = Config::default();
        config.set_theme("monochrome").unwrap();
        assert!(!config.get_active_theme().highlight_fg.is_empty());
    }
}
