//! Configuration validation errors and semantic validation.

use crate::learning::{
    ConstraintParams, EstimatorConfig, HillClimbingParams, LearnConfig, ScoreConfig, SearchConfig,
    SubModelConfig, TabuParams,
};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

impl From<ValidationError> for mctbn_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidValue { field, message } => {
                mctbn_common::Error::InvalidHyperparameter {
                    name: field,
                    reason: message,
                }
            }
            other => mctbn_common::Error::Config(other.to_string()),
        }
    }
}

/// Validate a learning configuration semantically.
pub fn validate_learn_config(config: &LearnConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_sub_model("class_model", &config.class_model)?;
    validate_sub_model("feature_model", &config.feature_model)?;

    if matches!(
        config.class_model.score,
        ScoreConfig::ConditionalLogLikelihood { .. }
    ) {
        return Err(ValidationError::SemanticError(
            "conditional_log_likelihood scores feature structures only; \
             use it for feature_model"
                .to_string(),
        ));
    }

    if let Some(k) = config.max_feature_parents {
        if matches!(config.feature_model.search, SearchConfig::ConstraintBased(_)) {
            return Err(ValidationError::SemanticError(format!(
                "max_feature_parents={} has no effect with a constraint_based feature search",
                k
            )));
        }
    }

    if let Some(threads) = config.threads {
        if threads == 0 {
            return Err(ValidationError::InvalidValue {
                field: "threads".to_string(),
                message: "Must be >= 1".to_string(),
            });
        }
    }

    Ok(())
}

fn validate_sub_model(name: &str, sub: &SubModelConfig) -> ValidationResult<()> {
    validate_estimator(&format!("{}.estimator", name), &sub.estimator)?;
    validate_score(&format!("{}.score", name), &sub.score)?;
    validate_search(&format!("{}.search", name), &sub.search)?;

    if !sub.search.uses_score() && !sub.score.is_decomposable() {
        return Err(ValidationError::SemanticError(format!(
            "{}: conditional_log_likelihood has no effect with a constraint_based search",
            name
        )));
    }

    Ok(())
}

fn validate_estimator(field: &str, estimator: &EstimatorConfig) -> ValidationResult<()> {
    if let EstimatorConfig::Bayesian {
        n_prior,
        m_prior,
        t_prior,
    } = *estimator
    {
        validate_prior(&format!("{}.n_prior", field), n_prior, false)?;
        validate_prior(&format!("{}.m_prior", field), m_prior, false)?;
        validate_prior(&format!("{}.t_prior", field), t_prior, false)?;

        if n_prior == 0.0 && m_prior == 0.0 && t_prior == 0.0 {
            return Err(ValidationError::SemanticError(format!(
                "{}: bayesian estimation needs at least one positive prior; \
                 use maximum_likelihood for zero pseudo-counts",
                field
            )));
        }
    }

    Ok(())
}

fn validate_score(field: &str, score: &ScoreConfig) -> ValidationResult<()> {
    if let ScoreConfig::BayesianDirichletEquivalent {
        n_prior,
        m_prior,
        t_prior,
        ..
    } = *score
    {
        validate_prior(&format!("{}.n_prior", field), n_prior, true)?;
        validate_prior(&format!("{}.m_prior", field), m_prior, true)?;
        validate_prior(&format!("{}.t_prior", field), t_prior, true)?;
    }

    Ok(())
}

fn validate_prior(field: &str, value: f64, strictly_positive: bool) -> ValidationResult<()> {
    if !value.is_finite() || value < 0.0 || (strictly_positive && value == 0.0) {
        let bound = if strictly_positive { "> 0" } else { ">= 0" };
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be finite and {}, got {}", bound, value),
        });
    }

    Ok(())
}

fn validate_search(field: &str, search: &SearchConfig) -> ValidationResult<()> {
    match search {
        SearchConfig::HillClimbing(params) => validate_hill_climbing(field, params),
        SearchConfig::Tabu(params) => validate_tabu(field, params),
        SearchConfig::ConstraintBased(params) => validate_constraint(field, params),
        SearchConfig::Hybrid(params) => {
            validate_constraint(&format!("{}.constraint", field), &params.constraint)?;
            validate_hill_climbing(&format!("{}.hill_climbing", field), &params.hill_climbing)
        }
    }
}

fn validate_hill_climbing(field: &str, params: &HillClimbingParams) -> ValidationResult<()> {
    if params.max_iterations == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.max_iterations", field),
            message: "Must be >= 1".to_string(),
        });
    }

    Ok(())
}

fn validate_tabu(field: &str, params: &TabuParams) -> ValidationResult<()> {
    if params.tabu_list_size == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.tabu_list_size", field),
            message: "Must be >= 1".to_string(),
        });
    }

    if params.max_iterations == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.max_iterations", field),
            message: "Must be >= 1".to_string(),
        });
    }

    if params.max_non_improving == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.max_non_improving", field),
            message: "Must be >= 1".to_string(),
        });
    }

    Ok(())
}

fn validate_constraint(field: &str, params: &ConstraintParams) -> ValidationResult<()> {
    for (name, value) in [
        ("significance", params.significance),
        ("transition_significance", params.transition_significance),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.{}", field, name),
                message: format!("Must be in [0, 1], got {}", value),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::{HybridParams, Penalization};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_learn_config(&LearnConfig::default()).is_ok());
    }

    #[test]
    fn test_significance_out_of_range() {
        let mut config = LearnConfig::default();
        config.feature_model.search = SearchConfig::ConstraintBased(ConstraintParams {
            significance: 1.5,
            ..ConstraintParams::default()
        });
        let err = validate_learn_config(&config).unwrap_err();
        assert_eq!(err.code(), 65);
        assert!(err.to_string().contains("feature_model.search.significance"));
    }

    #[test]
    fn test_nan_significance_rejected() {
        let params = ConstraintParams {
            transition_significance: f64::NAN,
            ..ConstraintParams::default()
        };
        assert!(validate_constraint("x", &params).is_err());
    }

    #[test]
    fn test_hybrid_validates_both_phases() {
        let mut config = LearnConfig::default();
        config.feature_model.search = SearchConfig::Hybrid(HybridParams {
            hill_climbing: HillClimbingParams {
                max_iterations: 0,
                ..HillClimbingParams::default()
            },
            ..HybridParams::default()
        });
        let err = validate_learn_config(&config).unwrap_err();
        assert!(err.to_string().contains("hill_climbing.max_iterations"));
    }

    #[test]
    fn test_bayesian_needs_positive_prior() {
        let mut config = LearnConfig::default();
        config.class_model.estimator = EstimatorConfig::Bayesian {
            n_prior: 0.0,
            m_prior: 0.0,
            t_prior: 0.0,
        };
        assert!(matches!(
            validate_learn_config(&config),
            Err(ValidationError::SemanticError(_))
        ));

        config.class_model.estimator = EstimatorConfig::Bayesian {
            n_prior: -1.0,
            m_prior: 1.0,
            t_prior: 1.0,
        };
        assert!(matches!(
            validate_learn_config(&config),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_bde_prior_must_be_positive() {
        let mut config = LearnConfig::default();
        config.feature_model.score = ScoreConfig::BayesianDirichletEquivalent {
            n_prior: 1.0,
            m_prior: 0.0,
            t_prior: 1.0,
            penalization: Penalization::None,
        };
        assert!(validate_learn_config(&config).is_err());
    }

    #[test]
    fn test_tabu_list_size_zero() {
        let mut config = LearnConfig::default();
        config.feature_model.search = SearchConfig::Tabu(TabuParams {
            tabu_list_size: 0,
            ..TabuParams::default()
        });
        assert!(validate_learn_config(&config).is_err());
    }

    #[test]
    fn test_cll_rules() {
        let mut config = LearnConfig::default();
        config.class_model.score = ScoreConfig::ConditionalLogLikelihood {
            penalization: Penalization::None,
        };
        assert!(validate_learn_config(&config).is_err());

        let mut config = LearnConfig::default();
        config.feature_model.score = ScoreConfig::ConditionalLogLikelihood {
            penalization: Penalization::None,
        };
        assert!(validate_learn_config(&config).is_ok());

        config.feature_model.search = SearchConfig::ConstraintBased(ConstraintParams::default());
        assert!(validate_learn_config(&config).is_err());
    }

    #[test]
    fn test_max_parents_with_constraint_search() {
        let mut config = LearnConfig::default();
        config.max_feature_parents = Some(2);
        assert!(validate_learn_config(&config).is_ok());

        config.feature_model.search = SearchConfig::ConstraintBased(ConstraintParams::default());
        assert!(validate_learn_config(&config).is_err());
    }

    #[test]
    fn test_threads_zero() {
        let config = LearnConfig {
            threads: Some(0),
            ..LearnConfig::default()
        };
        assert!(validate_learn_config(&config).is_err());
    }

    #[test]
    fn test_version_mismatch() {
        let config = LearnConfig {
            schema_version: "0.9.0".to_string(),
            ..LearnConfig::default()
        };
        let err = validate_learn_config(&config).unwrap_err();
        assert_eq!(err.code(), 66);
    }

    #[test]
    fn test_conversion_to_common_error() {
        let err = ValidationError::InvalidValue {
            field: "threads".into(),
            message: "Must be >= 1".into(),
        };
        let common: mctbn_common::Error = err.into();
        assert_eq!(common.code(), 11);
        assert_eq!(common.category(), mctbn_common::ErrorCategory::Config);
    }
}
