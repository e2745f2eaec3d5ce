//! Configuration management for snap-blade
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `SNAP_` prefix, `__` between
//!    section and key, e.g. `SNAP_BLADE__DEVELOPMENT_MODE=true`)
//! 2. `./blade.toml`, or the file passed to [`SnapConfig::load_from`]
//! 3. `~/.config/snap-blade/blade.toml` (user config)
//! 4. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! [theme]
//! templates_directory = "templates"
//! fallback_directories = ["../parent-theme/templates"]
//!
//! [blade]
//! file_extension = ".blade.html"
//! development_mode = true
//! ```

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BladeError, Result};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SNAP_";

/// Name of the configuration file
pub const CONFIG_FILE: &str = "blade.toml";

/// Where templates live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    /// Primary template directory
    pub templates_directory: PathBuf,

    /// Directories searched after the primary one, in order
    pub fallback_directories: Vec<PathBuf>,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            templates_directory: PathBuf::from("templates"),
            fallback_directories: Vec::new(),
        }
    }
}

/// Template engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BladeSettings {
    /// Extension of template files
    pub file_extension: String,

    /// Recompile templates on every render
    pub development_mode: bool,
}

impl Default for BladeSettings {
    fn default() -> Self {
        Self {
            file_extension: ".blade.html".to_string(),
            development_mode: false,
        }
    }
}

/// Complete snap-blade configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Template locations
    pub theme: ThemeSettings,

    /// Engine settings
    pub blade: BladeSettings,
}

impl SnapConfig {
    /// Load configuration from the standard locations
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::Config`] if a file is malformed or a value has
    /// the wrong type.
    pub fn load() -> Result<Self> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("snap-blade").join(CONFIG_FILE));
        }
        paths.push(PathBuf::from(CONFIG_FILE));
        Self::extract(Self::figment(&paths))
    }

    /// Load configuration from `path` instead of `./blade.toml`
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::Config`] if the file is malformed or a value has
    /// the wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::extract(Self::figment(&[path.as_ref().to_path_buf()]))
    }

    /// Layered configuration sources, lowest priority first
    #[must_use]
    pub fn figment(files: &[PathBuf]) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        for path in files {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                figment = figment.merge(Toml::file(path));
            }
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| BladeError::Config(e.to_string()))
    }

    /// Template search roots in lookup order
    #[must_use]
    pub fn template_roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.theme.templates_directory.clone())
            .chain(self.theme.fallback_directories.iter().cloned())
            .collect()
    }
}
