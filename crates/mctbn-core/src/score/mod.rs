//! Structure scores.
//!
//! Every score returns a real number where higher is better and may subtract
//! a complexity penalty. Log-likelihood and Bayesian-Dirichlet-equivalent
//! scores decompose into per-node local scores; the conditional
//! log-likelihood couples every feature with every class hypothesis and is
//! only available for whole structures.

mod cll;
mod decomposable;

pub use cll::ConditionalLogLikelihood;
pub use decomposable::{DecomposableScore, LocalScoreKind};

use crate::graph::AdjacencyMatrix;
use fixedbitset::FixedBitSet;
use mctbn_config::Penalization;

/// A score over the parent sets of a fixed set of nodes (its scope).
pub trait StructureScore: Sync {
    /// Whether the score is a sum of per-node local scores.
    fn is_decomposable(&self) -> bool;

    /// Local score of `node` under `parents`; `None` when the score does not
    /// decompose.
    fn local_score(&self, node: usize, parents: &FixedBitSet) -> Option<f64>;

    /// Score of the whole structure, restricted to the nodes in scope.
    fn structure_score(&self, adjacency: &AdjacencyMatrix) -> f64;

    /// Nodes whose parent sets the score depends on.
    fn scope(&self) -> &[usize];
}

/// Complexity penalty for `free_parameters` estimated from `sample_size`
/// observations.
pub fn penalty(penalization: Penalization, free_parameters: usize, sample_size: f64) -> f64 {
    let k = free_parameters as f64;
    match penalization {
        Penalization::None => 0.0,
        Penalization::Bic => 0.5 * sample_size.max(1.0).ln() * k,
        Penalization::Aic => k,
    }
}
