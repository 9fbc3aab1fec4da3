//! Learning configuration types.
//!
//! A configuration selects, independently for the class sub-model (a static
//! Bayesian network over class variables) and the feature sub-model (a
//! continuous-time Bayesian network over features), one parameter estimator,
//! one structure score and one search strategy. Every axis is a closed enum
//! whose variants carry their own hyperparameters.

use serde::{Deserialize, Serialize};

/// Complete learning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Static model over the class variables.
    pub class_model: SubModelConfig,

    /// Temporal model over the feature variables.
    pub feature_model: SubModelConfig,

    #[serde(default)]
    pub initial_structure: InitialStructure,

    /// Cap on the number of feature parents of a feature node.
    /// Class parents are never counted.
    #[serde(default)]
    pub max_feature_parents: Option<usize>,

    /// Seed for random restarts.
    #[serde(default)]
    pub seed: u64,

    /// Worker threads for node-parallel work (None: one per core).
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for LearnConfig {
    fn default() -> Self {
        LearnConfig {
            schema_version: default_schema_version(),
            description: None,
            class_model: SubModelConfig {
                estimator: EstimatorConfig::MaximumLikelihood,
                score: ScoreConfig::LogLikelihood {
                    penalization: Penalization::Bic,
                },
                search: SearchConfig::HillClimbing(HillClimbingParams::default()),
            },
            feature_model: SubModelConfig {
                estimator: EstimatorConfig::MaximumLikelihood,
                score: ScoreConfig::LogLikelihood {
                    penalization: Penalization::Bic,
                },
                search: SearchConfig::HillClimbing(HillClimbingParams::default()),
            },
            initial_structure: InitialStructure::Empty,
            max_feature_parents: None,
            seed: 0,
            threads: None,
        }
    }
}

impl LearnConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::validate::ValidationError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse a configuration from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Estimator, score and search strategy for one sub-model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubModelConfig {
    pub estimator: EstimatorConfig,
    pub score: ScoreConfig,
    pub search: SearchConfig,
}

/// Parameter estimation method.
///
/// Priors are equivalent sample sizes spread evenly across all cells of a
/// node's tables: `n_prior` for static counts, `m_prior` for transition
/// counts and `t_prior` for sojourn time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum EstimatorConfig {
    MaximumLikelihood,
    Bayesian {
        #[serde(default = "default_prior")]
        n_prior: f64,
        #[serde(default = "default_prior")]
        m_prior: f64,
        #[serde(default = "default_prior")]
        t_prior: f64,
    },
}

fn default_prior() -> f64 {
    1.0
}

impl EstimatorConfig {
    /// Equivalent sample sizes `(n, m, t)`; all zero for maximum likelihood.
    pub fn priors(&self) -> (f64, f64, f64) {
        match *self {
            EstimatorConfig::MaximumLikelihood => (0.0, 0.0, 0.0),
            EstimatorConfig::Bayesian {
                n_prior,
                m_prior,
                t_prior,
            } => (n_prior, m_prior, t_prior),
        }
    }
}

/// Complexity penalty subtracted from a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalization {
    #[default]
    None,
    /// `0.5 · ln(N) · free parameters`
    Bic,
    /// `free parameters`
    Aic,
}

/// Structure score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreConfig {
    LogLikelihood {
        #[serde(default)]
        penalization: Penalization,
    },
    BayesianDirichletEquivalent {
        #[serde(default = "default_prior")]
        n_prior: f64,
        #[serde(default = "default_prior")]
        m_prior: f64,
        #[serde(default = "default_prior")]
        t_prior: f64,
        #[serde(default)]
        penalization: Penalization,
    },
    /// Discriminative score; only meaningful for the feature model.
    ConditionalLogLikelihood {
        #[serde(default)]
        penalization: Penalization,
    },
}

impl ScoreConfig {
    pub fn penalization(&self) -> Penalization {
        match *self {
            ScoreConfig::LogLikelihood { penalization }
            | ScoreConfig::BayesianDirichletEquivalent { penalization, .. }
            | ScoreConfig::ConditionalLogLikelihood { penalization } => penalization,
        }
    }

    /// Whether the score is a sum of independent per-node terms.
    pub fn is_decomposable(&self) -> bool {
        !matches!(self, ScoreConfig::ConditionalLogLikelihood { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreConfig::LogLikelihood { .. } => "log_likelihood",
            ScoreConfig::BayesianDirichletEquivalent { .. } => "bayesian_dirichlet_equivalent",
            ScoreConfig::ConditionalLogLikelihood { .. } => "conditional_log_likelihood",
        }
    }
}

/// Structure search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SearchConfig {
    HillClimbing(HillClimbingParams),
    Tabu(TabuParams),
    ConstraintBased(ConstraintParams),
    Hybrid(HybridParams),
}

impl SearchConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchConfig::HillClimbing(_) => "hill_climbing",
            SearchConfig::Tabu(_) => "tabu",
            SearchConfig::ConstraintBased(_) => "constraint_based",
            SearchConfig::Hybrid(_) => "hybrid",
        }
    }

    /// Whether a score drives the search at all.
    pub fn uses_score(&self) -> bool {
        !matches!(self, SearchConfig::ConstraintBased(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingParams {
    /// Iteration cap per climb.
    pub max_iterations: usize,
    /// Additional climbs from randomized initial structures.
    pub random_restarts: usize,
    /// Random legal moves applied to the initial structure of each restart.
    pub restart_moves: usize,
}

impl Default for HillClimbingParams {
    fn default() -> Self {
        Self {
            max_iterations: 1_000,
            random_restarts: 0,
            restart_moves: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabuParams {
    /// Number of iterations an accepted move's inverse stays forbidden.
    pub tabu_list_size: usize,
    pub max_iterations: usize,
    /// Stop after this many consecutive steps without a new best score.
    pub max_non_improving: usize,
}

impl Default for TabuParams {
    fn default() -> Self {
        Self {
            tabu_list_size: 5,
            max_iterations: 200,
            max_non_improving: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintParams {
    /// Significance of the time-to-transition test (and of the static
    /// independence test for the class model).
    pub significance: f64,
    /// Significance of the state-to-state transition test.
    pub transition_significance: f64,
    /// Largest separating set tried (None: unbounded).
    pub max_separating_set: Option<usize>,
}

impl Default for ConstraintParams {
    fn default() -> Self {
        Self {
            significance: 0.05,
            transition_significance: 0.05,
            max_separating_set: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridParams {
    /// Restriction phase.
    pub constraint: ConstraintParams,
    /// Maximization phase.
    pub hill_climbing: HillClimbingParams,
}

/// Structure the search starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialStructure {
    #[default]
    Empty,
    /// Every class variable is a parent of every feature.
    NaiveBayes,
}
