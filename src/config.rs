//! # Settings
//!
//! Optional JSON settings file. Every field has a default, so an empty `{}` (or no file at all)
//! gives the stock behaviour: PyInstaller under Wine, the usual troublesome libraries,
//! `.exe` artifacts.
//!
//! Lookup order:
//! 1. `--config <FILE>` on the command line.
//! 2. `winforge.json` in the platform config directory (e.g. `%APPDATA%\winforge\config`).
//! 3. Built-in defaults.

use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Libraries that PyInstaller's static analysis routinely under-collects.
pub const DEFAULT_KNOWN_DEPENDENCIES: &[&str] = &[
    "requests",
    "psutil",
    "cryptography",
    "PIL",
    "numpy",
    "pandas",
    "scapy",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// argv of the packager, before any flags. The first element is the program.
    pub packager: Vec<String>,
    /// Top-level module names that get `--collect-all`.
    pub known_dependencies: Vec<String>,
    /// Extension of the produced binary, without the dot.
    pub artifact_extension: String,
    /// Directories (relative to the packager's working directory) wiped before each build.
    pub staging_dirs: Vec<String>,
    /// Where the packager drops the finished binary.
    pub dist_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            packager: ["wine", "python", "-m", "PyInstaller"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            known_dependencies: DEFAULT_KNOWN_DEPENDENCIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            artifact_extension: "exe".to_string(),
            staging_dirs: vec!["build".to_string(), "dist".to_string()],
            dist_dir: "dist".to_string(),
        }
    }
}

impl Settings {
    /// Parses a settings file. Unknown fields are ignored, missing ones defaulted.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {:?}", path))?;
        if settings.packager.is_empty() {
            anyhow::bail!("Settings file {:?} has an empty `packager` list", path);
        }
        Ok(settings)
    }

    /// Resolves settings following the lookup order above.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading settings from {:?}", path);
            return Self::from_file(path);
        }

        if let Some(path) = default_config_path().filter(|p| p.exists()) {
            info!("Loading settings from {:?}", path);
            return Self::from_file(&path);
        }

        debug!("No settings file found, using defaults");
        Ok(Self::default())
    }
}

/// `winforge.json` inside the per-user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "winforge")
        .map(|dirs| dirs.config_dir().join("winforge.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_toolchain() {
        let s = Settings::default();
        assert_eq!(s.packager, vec!["wine", "python", "-m", "PyInstaller"]);
        assert_eq!(s.known_dependencies.len(), 7);
        assert!(s.known_dependencies.contains(&"PIL".to_string()));
        assert_eq!(s.artifact_extension, "exe");
        assert_eq!(s.dist_dir, "dist");
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winforge.json");
        std::fs::write(&path, r#"{ "packager": ["pyinstaller"] }"#).unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.packager, vec!["pyinstaller"]);
        assert_eq!(s.artifact_extension, "exe");
        assert_eq!(s.known_dependencies, Settings::default().known_dependencies);
    }

    #[test]
    fn test_empty_packager_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winforge.json");
        std::fs::write(&path, r#"{ "packager": [] }"#).unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winforge.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
