//! Configuration resolution and path discovery.
//!
//! Resolution order: explicit path → environment variables → XDG paths → defaults.

use crate::learning::LearnConfig;
use crate::validate::{validate_learn_config, ValidationResult};
use std::path::{Path, PathBuf};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPath {
    /// Path to learn.json (or None if not found).
    pub path: Option<PathBuf>,

    /// Source of the config (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided by the caller.
    Explicit,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit => write!(f, "explicit path"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "MCTBN_CONFIG";
pub const ENV_CONFIG_DIR: &str = "MCTBN_CONFIG_DIR";

/// Standard config file name.
pub const CONFIG_FILENAME: &str = "learn.json";

/// Application name for XDG directories.
const APP_NAME: &str = "mctbn";

/// Resolve the learning configuration path.
///
/// Resolution order:
/// 1. Explicit path (if provided and present)
/// 2. MCTBN_CONFIG environment variable
/// 3. MCTBN_CONFIG_DIR environment variable + learn.json
/// 4. XDG config directory (~/.config/mctbn/learn.json)
/// 5. Built-in defaults (None)
pub fn resolve_config(explicit: Option<&Path>) -> ConfigPath {
    if let Some(path) = explicit {
        if path.exists() {
            return ConfigPath {
                path: Some(path.to_path_buf()),
                source: ConfigSource::Explicit,
            };
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return ConfigPath {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return ConfigPath {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return ConfigPath {
                path: Some(path),
                source: ConfigSource::XdgConfig,
            };
        }
    }

    ConfigPath::default()
}

/// Resolve, load and validate the learning configuration.
///
/// Falls back to [`LearnConfig::default`] when no file is found. A file that
/// exists but fails to parse or validate is an error, never silently replaced.
pub fn load_config(explicit: Option<&Path>) -> ValidationResult<(LearnConfig, ConfigSource)> {
    let resolved = resolve_config(explicit);
    let config = match &resolved.path {
        Some(path) => LearnConfig::from_file(path)?,
        None => LearnConfig::default(),
    };
    validate_learn_config(&config)?;
    Ok((config, resolved.source))
}

/// Get the XDG config directory for mctbn.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
