//! Serializable description of a learned model for report writers.

use crate::graph::{AdjacencyMatrix, FittedNode, NodeKind};
use crate::search::SearchOutcome;
use chrono::{DateTime, Utc};
use mctbn_common::Result;
use mctbn_config::{EstimatorConfig, SubModelConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub name: String,
    pub kind: NodeKind,
    pub cardinality: usize,
    pub parents: Vec<String>,
    pub free_parameters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSummary {
    pub from: String,
    pub to: String,
    /// Class to feature.
    pub bridge: bool,
}

/// How one sub-model was learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubModelSummary {
    pub estimator: String,
    pub score: String,
    pub search: String,
    /// `None` for score-free searches.
    pub score_value: Option<f64>,
    pub iterations: usize,
    pub edges: usize,
}

impl SubModelSummary {
    pub(crate) fn new(config: &SubModelConfig, outcome: &SearchOutcome, edges: usize) -> Self {
        let estimator = match config.estimator {
            EstimatorConfig::MaximumLikelihood => "maximum_likelihood",
            EstimatorConfig::Bayesian { .. } => "bayesian",
        };
        SubModelSummary {
            estimator: estimator.to_string(),
            score: config.score.as_str().to_string(),
            search: config.search.as_str().to_string(),
            score_value: outcome.score.is_finite().then_some(outcome.score),
            iterations: outcome.iterations,
            edges,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub schema_version: String,
    pub run_id: String,
    pub learned_at: DateTime<Utc>,
    pub sequences: usize,
    pub nodes: Vec<NodeSummary>,
    pub edges: Vec<EdgeSummary>,
    pub class_model: SubModelSummary,
    pub feature_model: SubModelSummary,
}

impl ModelSummary {
    pub(crate) fn describe_nodes(nodes: &[FittedNode], adjacency: &AdjacencyMatrix) -> (Vec<NodeSummary>, Vec<EdgeSummary>) {
        let name = |i: usize| nodes[i].node.name.clone();
        let summaries = nodes
            .iter()
            .map(|fitted| NodeSummary {
                name: fitted.node.name.clone(),
                kind: fitted.node.kind,
                cardinality: fitted.node.cardinality(),
                parents: adjacency.parent_indices(fitted.node.index).into_iter().map(name).collect(),
                free_parameters: fitted.model.free_parameters(),
            })
            .collect();
        let edges = adjacency
            .edges()
            .into_iter()
            .map(|(from, to)| EdgeSummary {
                from: name(from),
                to: name(to),
                bridge: nodes[from].node.is_class() && !nodes[to].node.is_class(),
            })
            .collect();
        (summaries, edges)
    }

    pub fn bridge_edges(&self) -> impl Iterator<Item = &EdgeSummary> {
        self.edges.iter().filter(|e| e.bridge)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
