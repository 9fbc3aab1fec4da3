//! Conditional log-likelihood of the class labels given the features.
//!
//! For every training sequence with known labels `c`:
//!
//! ```text
//! ln P(c) + ln L(features | c) − log Σ_c' [P(c') · L(features | c')]
//! ```
//!
//! The normalizer couples every feature with every class hypothesis, so each
//! candidate structure is scored by refitting every feature in scope. The
//! class prior is the already-fitted class network.

use super::{penalty, StructureScore};
use crate::classify::inference::{conditional_log_likelihood, log_joint, ClassSpace};
use crate::dataset::BoundDataset;
use crate::estimate::{Cim, ParameterEstimator};
use crate::graph::{AdjacencyMatrix, ParentConfig};
use fixedbitset::FixedBitSet;
use mctbn_config::Penalization;
use rayon::prelude::*;

pub struct ConditionalLogLikelihood<'a> {
    data: &'a BoundDataset,
    cardinalities: Vec<usize>,
    scope: Vec<usize>,
    space: &'a ClassSpace,
    truth: Vec<Option<usize>>,
    estimator: ParameterEstimator,
    penalization: Penalization,
}

impl<'a> ConditionalLogLikelihood<'a> {
    pub fn new(
        data: &'a BoundDataset,
        cardinalities: Vec<usize>,
        scope: Vec<usize>,
        space: &'a ClassSpace,
        estimator: ParameterEstimator,
        penalization: Penalization,
    ) -> Self {
        let truth = data.sequences().iter().map(|s| space.observed(s)).collect();
        ConditionalLogLikelihood {
            data,
            cardinalities,
            scope,
            space,
            truth,
            estimator,
            penalization,
        }
    }
}

impl StructureScore for ConditionalLogLikelihood<'_> {
    fn is_decomposable(&self) -> bool {
        false
    }

    fn local_score(&self, _node: usize, _parents: &FixedBitSet) -> Option<f64> {
        None
    }

    fn structure_score(&self, adjacency: &AdjacencyMatrix) -> f64 {
        let fitted: Vec<(usize, Cim, usize)> = self
            .scope
            .par_iter()
            .map(|&node| {
                let parents = ParentConfig::from_bits(adjacency.parents(node), &self.cardinalities);
                let stats = self.estimator.ctbn_statistics(
                    node,
                    parents,
                    self.cardinalities[node],
                    self.data,
                );
                (node, Cim::from_statistics(&stats), stats.free_parameters())
            })
            .collect();
        let features: Vec<(usize, &Cim)> = fitted.iter().map(|(n, cim, _)| (*n, cim)).collect();

        let fit: f64 = self
            .data
            .sequences()
            .par_iter()
            .zip(self.truth.par_iter())
            .filter_map(|(sequence, truth)| {
                let truth = (*truth)?;
                conditional_log_likelihood(&log_joint(self.space, &features, sequence), truth)
            })
            .sum();

        let n = self.data.num_sequences() as f64;
        let complexity: f64 = fitted
            .iter()
            .map(|(_, _, k)| penalty(self.penalization, *k, n))
            .sum();
        fit - complexity
    }

    fn scope(&self) -> &[usize] {
        &self.scope
    }
}
