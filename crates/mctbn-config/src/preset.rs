//! Configuration presets for the common learning setups.
//!
//! Provides pre-built configurations for:
//! - Hill climbing: Bayesian estimation scored with BDe, greedy search
//! - Tabu: penalized log-likelihood with tabu search
//! - CTPC: pure constraint-based search with independence tests
//! - Hybrid: CTPC restriction followed by hill climbing inside the skeleton

use crate::learning::{
    ConstraintParams, EstimatorConfig, HillClimbingParams, HybridParams, InitialStructure,
    LearnConfig, Penalization, ScoreConfig, SearchConfig, SubModelConfig, TabuParams,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetName {
    HillClimbing,
    Tabu,
    Ctpc,
    Hybrid,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::HillClimbing,
        PresetName::Tabu,
        PresetName::Ctpc,
        PresetName::Hybrid,
    ];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::HillClimbing => "hill-climbing",
            PresetName::Tabu => "tabu",
            PresetName::Ctpc => "ctpc",
            PresetName::Hybrid => "hybrid",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "hill-climbing" | "hill_climbing" | "hc" | "greedy" => Some(PresetName::HillClimbing),
            "tabu" | "tabu-search" => Some(PresetName::Tabu),
            "ctpc" | "pc" | "constraint" | "constraint-based" => Some(PresetName::Ctpc),
            "hybrid" | "mmhc" => Some(PresetName::Hybrid),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::HillClimbing => {
                "Bayesian estimation, BDe score, hill climbing from a naive Bayes structure"
            }
            PresetName::Tabu => "Maximum likelihood, BIC-penalized log-likelihood, tabu search",
            PresetName::Ctpc => "Conditional-independence tests at 5% significance, no score",
            PresetName::Hybrid => {
                "Independence tests prune the candidate parents, hill climbing maximizes BIC"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Get the learning configuration for a preset.
pub fn get_preset(name: PresetName) -> LearnConfig {
    match name {
        PresetName::HillClimbing => hill_climbing_preset(),
        PresetName::Tabu => tabu_preset(),
        PresetName::Ctpc => ctpc_preset(),
        PresetName::Hybrid => hybrid_preset(),
    }
}

fn bic() -> ScoreConfig {
    ScoreConfig::LogLikelihood {
        penalization: Penalization::Bic,
    }
}

fn hill_climbing_preset() -> LearnConfig {
    let bayesian = EstimatorConfig::Bayesian {
        n_prior: 1.0,
        m_prior: 1.0,
        t_prior: 1.0,
    };
    let bde = ScoreConfig::BayesianDirichletEquivalent {
        n_prior: 1.0,
        m_prior: 1.0,
        t_prior: 1.0,
        penalization: Penalization::None,
    };
    let search = SearchConfig::HillClimbing(HillClimbingParams {
        random_restarts: 2,
        ..HillClimbingParams::default()
    });

    LearnConfig {
        description: Some("preset:hill-climbing".to_string()),
        class_model: SubModelConfig {
            estimator: bayesian,
            score: bde,
            search,
        },
        feature_model: SubModelConfig {
            estimator: bayesian,
            score: bde,
            search,
        },
        initial_structure: InitialStructure::NaiveBayes,
        ..LearnConfig::default()
    }
}

fn tabu_preset() -> LearnConfig {
    let search = SearchConfig::Tabu(TabuParams::default());

    LearnConfig {
        description: Some("preset:tabu".to_string()),
        class_model: SubModelConfig {
            estimator: EstimatorConfig::MaximumLikelihood,
            score: bic(),
            search,
        },
        feature_model: SubModelConfig {
            estimator: EstimatorConfig::MaximumLikelihood,
            score: bic(),
            search,
        },
        ..LearnConfig::default()
    }
}

fn ctpc_preset() -> LearnConfig {
    let search = SearchConfig::ConstraintBased(ConstraintParams::default());

    LearnConfig {
        description: Some("preset:ctpc".to_string()),
        class_model: SubModelConfig {
            estimator: EstimatorConfig::MaximumLikelihood,
            score: bic(),
            search,
        },
        feature_model: SubModelConfig {
            estimator: EstimatorConfig::MaximumLikelihood,
            score: bic(),
            search,
        },
        ..LearnConfig::default()
    }
}

fn hybrid_preset() -> LearnConfig {
    let search = SearchConfig::Hybrid(HybridParams::default());

    LearnConfig {
        description: Some("preset:hybrid".to_string()),
        class_model: SubModelConfig {
            estimator: EstimatorConfig::MaximumLikelihood,
            score: bic(),
            search,
        },
        feature_model: SubModelConfig {
            estimator: EstimatorConfig::MaximumLikelihood,
            score: bic(),
            search,
        },
        ..LearnConfig::default()
    }
}

/// Information about a preset for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub feature_search: String,
    pub feature_score: String,
    pub initial_structure: InitialStructure,
}

impl PresetInfo {
    /// Create info from a preset.
    pub fn from_preset(name: PresetName) -> Self {
        let config = get_preset(name);
        Self {
            name: name.as_str().to_string(),
            description: name.description().to_string(),
            feature_search: config.feature_model.search.as_str().to_string(),
            feature_score: config.feature_model.score.as_str().to_string(),
            initial_structure: config.initial_structure,
        }
    }
}

/// List all available presets with summary information.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| PresetInfo::from_preset(name))
        .collect()
}
