//! Learning configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the learning configuration (`learn.json`)
//! - Config resolution (explicit path → env → XDG → defaults)
//! - Semantic validation run before any learning starts
//! - Named presets for the common search strategies

pub mod learning;
pub mod preset;
pub mod resolve;
pub mod validate;

pub use learning::{
    ConstraintParams, EstimatorConfig, HillClimbingParams, HybridParams, InitialStructure,
    LearnConfig, Penalization, ScoreConfig, SearchConfig, SubModelConfig, TabuParams,
};
pub use preset::{get_preset, PresetName};
pub use resolve::{load_config, resolve_config, ConfigPath, ConfigSource};
pub use validate::{validate_learn_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = mctbn_common::SCHEMA_VERSION;
