//! Configuration loading, resolution and preset tests against real files.
//!
//! Covers:
//! - Resolution order (explicit > MCTBN_CONFIG > MCTBN_CONFIG_DIR)
//! - Loading with validation
//! - Preset determinism

use mctbn_config::preset::{get_preset, PresetName};
use mctbn_config::resolve::{load_config, resolve_config, ConfigSource, CONFIG_FILENAME};
use mctbn_config::{LearnConfig, SearchConfig, ValidationError};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const ENV_KEYS: &[&str] = &["MCTBN_CONFIG", "MCTBN_CONFIG_DIR", "XDG_CONFIG_HOME"];

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f()
}

fn write_config(dir: &Path, config: &LearnConfig) -> std::path::PathBuf {
    fs::create_dir_all(dir).expect("create config dir");
    let path = dir.join(CONFIG_FILENAME);
    fs::write(&path, config.to_json_pretty()).expect("write config");
    path
}

#[test]
fn test_explicit_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let explicit = write_config(&temp.path().join("explicit"), &get_preset(PresetName::Tabu));
        let env_path = write_config(&temp.path().join("env"), &get_preset(PresetName::Ctpc));

        env::set_var("MCTBN_CONFIG", env_path.display().to_string());

        let resolved = resolve_config(Some(&explicit));
        assert_eq!(resolved.source, ConfigSource::Explicit);
        assert_eq!(resolved.path.unwrap(), explicit);
    });
}

#[test]
fn test_env_path_over_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let env_path = write_config(&temp.path().join("env"), &get_preset(PresetName::Tabu));
        let dir = temp.path().join("dir");
        write_config(&dir, &get_preset(PresetName::Hybrid));

        env::set_var("MCTBN_CONFIG", env_path.display().to_string());
        env::set_var("MCTBN_CONFIG_DIR", dir.display().to_string());

        let (config, source) = load_config(None).expect("load");
        assert_eq!(source, ConfigSource::Environment);
        assert!(matches!(config.feature_model.search, SearchConfig::Tabu(_)));
    });
}

#[test]
fn test_config_dir_used_when_env_path_missing() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("dir");
        write_config(&dir, &get_preset(PresetName::Hybrid));

        env::set_var("MCTBN_CONFIG", temp.path().join("missing.json").display().to_string());
        env::set_var("MCTBN_CONFIG_DIR", dir.display().to_string());

        let (config, source) = load_config(None).expect("load");
        assert_eq!(source, ConfigSource::Environment);
        assert!(matches!(config.feature_model.search, SearchConfig::Hybrid(_)));
    });
}

#[test]
fn test_invalid_file_is_an_error() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        env::remove_var("MCTBN_CONFIG");
        env::remove_var("MCTBN_CONFIG_DIR");
        let temp = TempDir::new().expect("temp dir");

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{ not json").expect("write");
        assert!(matches!(
            load_config(Some(&broken)),
            Err(ValidationError::ParseError(_))
        ));

        let mut config = get_preset(PresetName::Tabu);
        config.threads = Some(0);
        let bad = write_config(&temp.path().join("bad"), &config);
        assert!(matches!(
            load_config(Some(&bad)),
            Err(ValidationError::InvalidValue { .. })
        ));
    });
}

#[test]
fn test_presets_are_deterministic() {
    for &name in PresetName::ALL {
        assert_eq!(get_preset(name), get_preset(name));
        let json = get_preset(name).to_json_pretty();
        assert_eq!(LearnConfig::from_str(&json).expect("parse"), get_preset(name));
    }
}
