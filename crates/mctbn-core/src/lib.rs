//! Multidimensional continuous-time Bayesian network classifiers.
//!
//! This library provides the learning engine and the classifier:
//! - Datasets of labeled multivariate event sequences
//! - Sufficient statistics and parameter estimation per node
//! - Structure scores and structure search (hill climbing, tabu,
//!   constraint-based and hybrid)
//! - Exact inference over class configurations and evaluation metrics
//!
//! The entry points are [`Mctbnc::learn`] and [`Mctbnc::predict`].

pub mod classify;
pub mod dataset;
pub mod estimate;
pub mod graph;
pub mod logging;
pub mod metrics;
pub mod score;
pub mod search;
pub mod stats;

pub use classify::{Mctbnc, ModelSummary, Posterior, Prediction};
pub use dataset::{Dataset, DatasetBuilder, DatasetError, SequenceRejection};
pub use metrics::{evaluate, EvaluationReport, VariableMetrics};
pub use search::{Operation, SearchOutcome, SearchStep};

pub use mctbn_common::{Error, Result, State};
pub use mctbn_config::LearnConfig;
