//! Common types and errors for multidimensional continuous-time Bayesian
//! network classifiers.
//!
//! This crate provides foundational types shared across the workspace:
//! - The [`State`] assignment used as a key for class configurations
//! - Common error types with stable codes
//! - Schema versioning for serialized models and configs

pub mod error;
pub mod state;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use state::State;

/// Schema version stamped on serialized configs and model summaries.
pub const SCHEMA_VERSION: &str = "1.0.0";
