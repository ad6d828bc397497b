// ABOUTME: Configuration file loading, validation, and hierarchical merging for the preview CLI
// ABOUTME: Supports TOML config files with XDG Base Directory lookup and environment overrides

use crate::constants::env;
use anyhow::{anyhow, Context, Result};
use preview_core::Settings;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub show_image_preview_on_gutter: Option<bool>,
    #[serde(default)]
    pub source_folder: Option<String>,
    #[serde(default)]
    pub workspace_folders: Option<Vec<PathBuf>>,
    /// File extension (without dot) to host language id
    #[serde(default)]
    pub languages: Option<HashMap<String, String>>,
}

impl Config {
    /// Load configuration from standard XDG-compliant locations
    pub fn load() -> Result<Self> {
        let paths = Self::get_config_paths();
        Self::load_from_paths(&paths.iter().map(|p| p.as_str()).collect::<Vec<_>>())
    }

    /// Load configuration from file paths listed highest precedence first
    pub fn load_from_paths(paths: &[&str]) -> Result<Self> {
        let mut config = Config::default();

        for path in paths.iter().rev() {
            if !Path::new(path).exists() {
                continue;
            }
            // An unreadable config file should not stop previews from working
            match Self::load_from_file(path) {
                Ok(file_config) => config = config.merge(file_config),
                Err(e) => log::warn!("Ignoring config file {}: {:#}", path, e),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse TOML config file: {}",
                path.as_ref().display()
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get standard config file paths in order of precedence (highest first)
    pub fn get_config_paths() -> Vec<String> {
        let mut paths = Vec::new();

        // 1. Project-specific config (highest precedence)
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(
                current_dir
                    .join("gutter-preview.toml")
                    .to_string_lossy()
                    .to_string(),
            );
        }

        // 2. XDG config home
        if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
            let path = PathBuf::from(config_home)
                .join("gutter-preview")
                .join("config.toml");
            paths.push(path.to_string_lossy().to_string());
        }

        // 3. User config directory fallback
        if let Some(home_dir) = dirs::home_dir() {
            let path = home_dir
                .join(".config")
                .join("gutter-preview")
                .join("config.toml");
            paths.push(path.to_string_lossy().to_string());
        }

        paths
    }

    /// Merge this config with another, giving precedence to the other config
    pub fn merge(self, other: Config) -> Config {
        Config {
            show_image_preview_on_gutter: other
                .show_image_preview_on_gutter
                .or(self.show_image_preview_on_gutter),
            source_folder: other.source_folder.or(self.source_folder),
            workspace_folders: other.workspace_folders.or(self.workspace_folders),
            languages: match (self.languages, other.languages) {
                (Some(mut base), Some(other)) => {
                    base.extend(other);
                    Some(base)
                }
                (base, other) => other.or(base),
            },
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref folder) = self.source_folder {
            let path = Path::new(folder);
            if path.is_absolute() {
                return Err(anyhow!(
                    "source_folder must be relative to the workspace root: {}",
                    folder
                ));
            }
            if path.components().any(|c| c == Component::ParentDir) {
                return Err(anyhow!(
                    "source_folder must stay inside the workspace: {}",
                    folder
                ));
            }
        }

        Ok(())
    }

    /// Host settings as the preview session sees them, environment overrides applied
    pub fn to_settings(&self) -> Settings {
        let defaults = Settings::default();

        let show_image_preview_on_gutter = if std::env::var_os(env::HIDE_GUTTER).is_some() {
            false
        } else {
            self.show_image_preview_on_gutter
                .unwrap_or(defaults.show_image_preview_on_gutter)
        };

        let source_folder = std::env::var(env::SOURCE_FOLDER)
            .ok()
            .or_else(|| self.source_folder.clone())
            .unwrap_or(defaults.source_folder);

        Settings {
            show_image_preview_on_gutter,
            source_folder,
        }
    }

    /// Language id for a document, from configured overrides then built-in guesses
    pub fn language_for(&self, path: &Path) -> String {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if let Some(language) = self
            .languages
            .as_ref()
            .and_then(|languages| languages.get(&extension))
        {
            return language.clone();
        }

        crate::constants::language_for_extension(&extension).to_string()
    }
}
