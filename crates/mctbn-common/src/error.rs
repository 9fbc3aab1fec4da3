//! Error types for classifier learning.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for callers running many learning jobs
//!
//! Only failures that stop a computation are errors. Rejected sequences,
//! unseen states and illegal candidate structures are ordinary values in
//! `mctbn-core` and never surface here.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 11,
//!   "category": "config",
//!   "message": "invalid hyperparameter significance: must be within [0, 1]",
//!   "recoverable": true,
//!   "context": { "name": "significance" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Out-of-range or inconsistent hyperparameters.
    Config,
    /// Dataset construction and variable lookup errors.
    Data,
    /// Parameter estimation and prediction errors.
    Inference,
    /// Explicitly requested structures that cannot be built.
    Structure,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Structure => write!(f, "structure"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for classifier learning.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid hyperparameter {name}: {reason}")]
    InvalidHyperparameter { name: String, reason: String },

    // Data errors (20-29)
    #[error("data error: {0}")]
    Data(String),

    #[error("variable {name} not found in dataset")]
    MissingVariable { name: String },

    #[error("dataset has no usable sequences")]
    EmptyDataset,

    #[error("value {value:?} is outside the domain of variable {variable}")]
    UnknownValue { variable: String, value: String },

    // Inference errors (30-39)
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    #[error("model has not been learned")]
    NotLearned,

    // Structure errors (40-49)
    #[error("illegal structure: {0}")]
    IllegalStructure(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Data errors
    /// - 30-39: Inference errors
    /// - 40-49: Structure errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidHyperparameter { .. } => 11,
            Error::Data(_) => 20,
            Error::MissingVariable { .. } => 21,
            Error::EmptyDataset => 22,
            Error::UnknownValue { .. } => 23,
            Error::Inference(_) => 30,
            Error::NumericalInstability(_) => 31,
            Error::NotLearned => 32,
            Error::IllegalStructure(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidHyperparameter { .. } => ErrorCategory::Config,
            Error::Data(_)
            | Error::MissingVariable { .. }
            | Error::EmptyDataset
            | Error::UnknownValue { .. } => ErrorCategory::Data,
            Error::Inference(_) | Error::NumericalInstability(_) | Error::NotLearned => {
                ErrorCategory::Inference
            }
            Error::IllegalStructure(_) => ErrorCategory::Structure,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Recoverable errors go away by changing the inputs of the call
    /// (a corrected config, a different dataset). Unrecoverable ones indicate
    /// misuse of the API.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidHyperparameter { .. } => true,

            Error::Data(_) => true,
            Error::MissingVariable { .. } => true,
            Error::EmptyDataset => true,
            Error::UnknownValue { .. } => true,

            Error::Inference(_) => true,
            Error::NumericalInstability(_) => true,
            Error::NotLearned => false, // predict called before learn

            Error::IllegalStructure(_) => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidHyperparameter { .. } => "Invalid Hyperparameter",
            Error::Data(_) => "Data Error",
            Error::MissingVariable { .. } => "Missing Variable",
            Error::EmptyDataset => "Empty Dataset",
            Error::UnknownValue { .. } => "Unknown Value",
            Error::Inference(_) => "Inference Error",
            Error::NumericalInstability(_) => "Numerical Instability",
            Error::NotLearned => "Model Not Learned",
            Error::IllegalStructure(_) => "Illegal Structure",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., variable name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidHyperparameter { name, .. } => {
                context.insert("name".to_string(), serde_json::json!(name));
            }
            Error::MissingVariable { name } => {
                context.insert("variable".to_string(), serde_json::json!(name));
            }
            Error::UnknownValue { variable, value } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
                context.insert("value".to_string(), serde_json::json!(value));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("test".into()).code(), 10);
        assert_eq!(Error::EmptyDataset.code(), 22);
        assert_eq!(Error::IllegalStructure("cycle".into()).code(), 40);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::Config("test".into()).category(), ErrorCategory::Config);
        assert_eq!(
            Error::MissingVariable { name: "t".into() }.category(),
            ErrorCategory::Data
        );
        assert_eq!(Error::NotLearned.category(), ErrorCategory::Inference);
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::Config("test".into()).is_recoverable());
        assert!(!Error::NotLearned.is_recoverable());
        assert!(!Error::IllegalStructure("x".into()).is_recoverable());
    }

    #[test]
    fn test_structured_error_context() {
        let err = Error::UnknownValue {
            variable: "C".into(),
            value: "7".into(),
        };
        let structured = StructuredError::from(&err);

        assert_eq!(structured.code, 23);
        assert_eq!(structured.category, ErrorCategory::Data);
        assert_eq!(structured.context.get("variable"), Some(&serde_json::json!("C")));
        assert_eq!(structured.context.get("value"), Some(&serde_json::json!("7")));
    }

    #[test]
    fn test_structured_error_json() {
        let err = Error::InvalidHyperparameter {
            name: "significance".into(),
            reason: "must be within [0, 1]".into(),
        };
        let json = StructuredError::from(&err).with_context("value", 1.5).to_json();

        assert!(json.contains(r#""code":11"#));
        assert!(json.contains(r#""category":"config""#));
        assert!(json.contains(r#""recoverable":true"#));
        assert!(json.contains(r#""value":1.5"#));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Structure.to_string(), "structure");
        assert_eq!(ErrorCategory::Data.to_string(), "data");
    }
}
