//! Configuration management (config.toml)
//!
//! Settings live in the platform-specific config directory. Every section
//! falls back to defaults, so a partial or missing file is always usable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::axes::AxesSettings;
use crate::camera::{CameraSettings, TrackballSettings};
use crate::hud::HudSettings;
use crate::raymarch::RaymarchSettings;
use crate::slicer::Resolution;

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub slicer: SlicerConfig,
    #[serde(default)]
    pub raymarch: RaymarchSettings,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub trackball: TrackballSettings,
    #[serde(default)]
    pub hud: HudSettings,
    #[serde(default)]
    pub axes: AxesSettings,
    #[serde(default)]
    pub includes: IncludeConfig,
}

/// Main window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Initial inner width in logical pixels (default: 1280)
    #[serde(default = "default_width")]
    pub width: u32,
    /// Initial inner height in logical pixels (default: 800)
    #[serde(default = "default_height")]
    pub height: u32,
    /// Whether to enable vertical sync (default: true)
    #[serde(default = "default_true")]
    pub vsync: bool,
}

/// Slicer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SlicerConfig {
    /// Slice count used until a document asks for another (default: 512)
    #[serde(default)]
    pub resolution: Resolution,
}

/// Where fetched `#include` snippets are cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IncludeConfig {
    /// Overrides the platform cache directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    800
}
fn default_true() -> bool {
    true
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            vsync: default_true(),
        }
    }
}

impl IncludeConfig {
    /// Cache directory to read snippets from, if any can be determined.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(cache_dir)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com.github", "gmlewis", "irmf-viewer")
}

/// Returns the platform-specific configuration directory.
///
/// On Linux: `~/.config/irmf-viewer`
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific cache directory for `#include` snippets.
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().join("includes"))
}

/// Loads the configuration from disk.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    config_dir()
        .map(|dir| load_from(&dir.join("config.toml")))
        .unwrap_or_default()
}

/// Loads `path`, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("ignoring invalid config {}: {e}", path.display());
            Config::default()
        }
    }
}

/// Saves the configuration to the platform config directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &Config) -> std::io::Result<()> {
    match config_dir() {
        Some(dir) => save_to(config, &dir.join("config.toml")),
        None => Ok(()),
    }
}

/// Writes `config` to `path` as pretty TOML, creating parent directories.
pub fn save_to(config: &Config, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.window.width, 1280);
        assert!(config.window.vsync);
        assert_eq!(config.slicer.resolution.get(), 512);
        assert_eq!(config.raymarch.max_steps, 256);
        assert!((config.camera.ortho_frustum_factor - 0.542).abs() < f32::EPSILON);
        assert_eq!(config.hud.size, 256);
        assert!(config.axes.show && config.axes.show_through);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
[slicer]
resolution = 128

[raymarch]
max_steps = 64

[camera]
fov_degrees = 60.0

[axes]
show_through = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.slicer.resolution.get(), 128);
        assert_eq!(config.raymarch.max_steps, 64);
        assert!((config.raymarch.hit_epsilon - 0.001).abs() < f32::EPSILON);
        assert!((config.camera.fov_degrees - 60.0).abs() < f32::EPSILON);
        assert!((config.camera.ortho_frustum_factor - 0.542).abs() < f32::EPSILON);
        assert_eq!(config.window, WindowConfig::default());
        assert!(config.axes.show);
        assert!(!config.axes.show_through);
    }

    #[test]
    fn test_unsupported_resolution_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[slicer]\nresolution = 100\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.window.width = 640;
        config.slicer.resolution = Resolution::try_from(2048).unwrap();
        config.includes.cache_dir = Some(dir.path().join("cache"));
        config.axes.show = false;
        save_to(&config, &path).unwrap();

        assert_eq!(load_from(&path), config);
    }

    #[test]
    fn test_invalid_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[window\nwidth = ").unwrap();
        assert_eq!(load_from(&path), Config::default());
        assert_eq!(load_from(&dir.path().join("missing.toml")), Config::default());
    }
}
