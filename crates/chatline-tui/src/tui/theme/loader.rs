//! Theme lookup: built-in presets, bundled TOML themes, then user theme directories

use super::{RawTheme, Theme, ThemeError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PRESETS: &[&str] = &["light", "dark"];

const BUNDLED_THEMES: &[(&str, &str)] = &[
    ("midnight", include_str!("../../../themes/midnight.toml")),
    ("paper", include_str!("../../../themes/paper.toml")),
];

/// Finds and loads themes by name or path
#[derive(Debug, Clone)]
pub struct ThemeLoader {
    search_paths: Vec<PathBuf>,
}

impl Default for ThemeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeLoader {
    /// Loader with the platform config and data directories as search paths
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "chatline") {
            // e.g. ~/.config/chatline/themes on Linux
            search_paths.push(proj_dirs.config_dir().join("themes"));
            search_paths.push(proj_dirs.data_dir().join("themes"));
        }

        Self { search_paths }
    }

    /// Loader that only knows presets, bundled themes and explicitly added paths
    pub fn without_user_dirs() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn load_theme(&self, name: &str) -> Result<Theme, ThemeError> {
        if let Some(theme) = Theme::preset(name) {
            return Ok(theme);
        }

        if let Some((_, content)) = BUNDLED_THEMES
            .iter()
            .find(|(bundled, _)| bundled.eq_ignore_ascii_case(name))
        {
            let raw_theme: RawTheme = toml::from_str(content)?;
            return raw_theme.into_theme();
        }

        let theme_file = self.find_theme_file(name)?;
        debug!(target: "theme", "Loading theme '{}' from {}", name, theme_file.display());
        let content = fs::read_to_string(&theme_file)?;
        let raw_theme: RawTheme = toml::from_str(&content)?;

        if !raw_theme.name.eq_ignore_ascii_case(name) {
            return Err(ThemeError::Validation(format!(
                "Theme name mismatch: expected '{}', found '{}'",
                name, raw_theme.name
            )));
        }

        raw_theme.into_theme()
    }

    pub fn load_theme_from_path(&self, path: &Path) -> Result<Theme, ThemeError> {
        let content = fs::read_to_string(path)?;
        let raw_theme: RawTheme = toml::from_str(&content)?;
        raw_theme.into_theme()
    }

    /// Every theme name that `load_theme` could resolve, sorted
    pub fn list_themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = PRESETS.iter().map(|name| (*name).to_string()).collect();
        themes.extend(BUNDLED_THEMES.iter().map(|(name, _)| (*name).to_string()));

        for search_path in &self.search_paths {
            let Ok(entries) = fs::read_dir(search_path) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() || path.extension().is_none_or(|ext| ext != "toml") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    themes.push(stem.to_string());
                }
            }
        }

        themes.sort();
        themes.dedup();
        themes
    }

    fn find_theme_file(&self, name: &str) -> Result<PathBuf, ThemeError> {
        let filename = format!("{name}.toml");
        self.search_paths
            .iter()
            .map(|dir| dir.join(&filename))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ThemeError::NotFound(name.to_string()))
    }
}
