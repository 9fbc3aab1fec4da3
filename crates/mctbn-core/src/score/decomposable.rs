//! Log-likelihood and Bayesian-Dirichlet-equivalent local scores.
//!
//! # Log-likelihood
//!
//! Static node: `Σ N_jk · ln θ_jk`. Temporal node:
//! `Σ M_jx · ln q_jx − q_jx · T_jx + Σ_y M_jxy · ln θ_jxy`. Counts are the
//! observed ones; parameters come from the sub-model's estimator. Terms with
//! a zero parameter contribute 0.
//!
//! # BDe
//!
//! Static node: Dirichlet evidence of every row. Temporal node: the
//! Gamma-Poisson evidence of the sojourn times plus the Dirichlet evidence of
//! the destinations,
//!
//! ```text
//! ln Γ(α_x + M_x + 1) + (α_x + 1)·ln τ_x − ln Γ(α_x + 1) − (α_x + M_x + 1)·ln(τ_x + T_x)
//!   + ln B(α_xy + M_xy) − ln B(α_xy)
//! ```
//!
//! with `α_xy`, `α_x = Σ_y α_xy` and `τ_x` the pseudo-counts of the cell.

use super::{penalty, StructureScore};
use crate::dataset::BoundDataset;
use crate::estimate::{Cim, Cpt, ParameterEstimator};
use crate::graph::{AdjacencyMatrix, NodeKind, ParentConfig};
use crate::stats::{BnStatistics, CtbnStatistics};
use fixedbitset::FixedBitSet;
use mctbn_config::{EstimatorConfig, Penalization, ScoreConfig};
use mctbn_math::dirichlet::{log_dirichlet_evidence, DirichletParams};
use mctbn_math::log_gamma;

/// Local score family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalScoreKind {
    /// Parameters fitted with the given estimator.
    LogLikelihood(ParameterEstimator),
    /// Equivalent sample sizes of the Dirichlet and Gamma priors.
    Bde { n_prior: f64, m_prior: f64, t_prior: f64 },
}

/// Penalized decomposable score over a scope of nodes.
pub struct DecomposableScore<'a> {
    data: &'a BoundDataset,
    cardinalities: Vec<usize>,
    kinds: Vec<NodeKind>,
    scope: Vec<usize>,
    kind: LocalScoreKind,
    penalization: Penalization,
}

impl<'a> DecomposableScore<'a> {
    pub fn new(
        data: &'a BoundDataset,
        cardinalities: Vec<usize>,
        kinds: Vec<NodeKind>,
        scope: Vec<usize>,
        kind: LocalScoreKind,
        penalization: Penalization,
    ) -> Self {
        DecomposableScore {
            data,
            cardinalities,
            kinds,
            scope,
            kind,
            penalization,
        }
    }

    /// Build from a score configuration; `None` for non-decomposable scores.
    pub fn from_config(
        data: &'a BoundDataset,
        cardinalities: Vec<usize>,
        kinds: Vec<NodeKind>,
        scope: Vec<usize>,
        score: &ScoreConfig,
        estimator: &EstimatorConfig,
    ) -> Option<Self> {
        let kind = match *score {
            ScoreConfig::LogLikelihood { .. } => {
                LocalScoreKind::LogLikelihood(ParameterEstimator::from_config(estimator))
            }
            ScoreConfig::BayesianDirichletEquivalent {
                n_prior,
                m_prior,
                t_prior,
                ..
            } => LocalScoreKind::Bde {
                n_prior,
                m_prior,
                t_prior,
            },
            ScoreConfig::ConditionalLogLikelihood { .. } => return None,
        };
        Some(Self::new(
            data,
            cardinalities,
            kinds,
            scope,
            kind,
            score.penalization(),
        ))
    }

    fn estimator(&self) -> ParameterEstimator {
        match self.kind {
            LocalScoreKind::LogLikelihood(estimator) => estimator,
            LocalScoreKind::Bde {
                n_prior,
                m_prior,
                t_prior,
            } => ParameterEstimator::bayesian(n_prior, m_prior, t_prior),
        }
    }

    /// Local score of one node, penalty included.
    pub fn local(&self, node: usize, parents: &FixedBitSet) -> f64 {
        let config = ParentConfig::from_bits(parents, &self.cardinalities);
        let r = self.cardinalities[node];
        let estimator = self.estimator();
        match self.kinds[node] {
            NodeKind::Class => {
                let stats = estimator.bn_statistics(node, config, r, self.data);
                let fit = match self.kind {
                    LocalScoreKind::LogLikelihood(_) => bn_log_likelihood(&stats),
                    LocalScoreKind::Bde { .. } => bn_bde(&stats),
                };
                let n = self.data.num_sequences() as f64;
                fit - penalty(self.penalization, stats.free_parameters(), n)
            }
            NodeKind::Feature => {
                let stats = estimator.ctbn_statistics(node, config, r, self.data);
                let fit = match self.kind {
                    LocalScoreKind::LogLikelihood(_) => ctbn_log_likelihood(&stats),
                    LocalScoreKind::Bde { .. } => ctbn_bde(&stats),
                };
                let n = stats.total_observed_transitions();
                fit - penalty(self.penalization, stats.free_parameters(), n)
            }
        }
    }
}

impl StructureScore for DecomposableScore<'_> {
    fn is_decomposable(&self) -> bool {
        true
    }

    fn local_score(&self, node: usize, parents: &FixedBitSet) -> Option<f64> {
        Some(self.local(node, parents))
    }

    fn structure_score(&self, adjacency: &AdjacencyMatrix) -> f64 {
        self.scope
            .iter()
            .map(|&node| self.local(node, adjacency.parents(node)))
            .sum()
    }

    fn scope(&self) -> &[usize] {
        &self.scope
    }
}

#[inline]
fn weighted_log(count: f64, parameter: f64) -> f64 {
    if count > 0.0 && parameter > 0.0 {
        count * parameter.ln()
    } else {
        0.0
    }
}

pub(crate) fn bn_log_likelihood(stats: &BnStatistics) -> f64 {
    let cpt = Cpt::from_statistics(stats);
    let mut total = 0.0;
    for j in 0..stats.num_configurations() {
        for k in 0..stats.cardinality() {
            total += weighted_log(stats.observed(j, k), cpt.probability(j, k));
        }
    }
    total
}

pub(crate) fn ctbn_log_likelihood(stats: &CtbnStatistics) -> f64 {
    let cim = Cim::from_statistics(stats);
    let r = stats.cardinality();
    let mut total = 0.0;
    for j in 0..stats.num_configurations() {
        for x in 0..r {
            let rate = cim.rate(j, x);
            total += weighted_log(stats.observed_leave(j, x), rate);
            total -= rate * stats.observed_sojourn(j, x);
            for y in (0..r).filter(|&y| y != x) {
                total += weighted_log(stats.observed_transition(j, x, y), cim.destination(j, x, y));
            }
        }
    }
    total
}

fn bn_bde(stats: &BnStatistics) -> f64 {
    let r = stats.cardinality();
    let Some(prior) = DirichletParams::symmetric(r, stats.prior()) else {
        return 0.0;
    };
    (0..stats.num_configurations())
        .map(|j| log_dirichlet_evidence(&prior, &stats.observed_row(j)))
        .sum()
}

fn ctbn_bde(stats: &CtbnStatistics) -> f64 {
    let r = stats.cardinality();
    let alpha = stats.leave_prior();
    let tau = stats.sojourn_prior();
    let destination_prior = DirichletParams::symmetric(r.saturating_sub(1), stats.transition_prior());

    let mut total = 0.0;
    for j in 0..stats.num_configurations() {
        for x in 0..r {
            let m = stats.observed_leave(j, x);
            let t = stats.observed_sojourn(j, x);
            if tau > 0.0 {
                total += log_gamma(alpha + m + 1.0) + (alpha + 1.0) * tau.ln()
                    - log_gamma(alpha + 1.0)
                    - (alpha + m + 1.0) * (tau + t).ln();
            }
            if let Some(prior) = &destination_prior {
                total += log_dirichlet_evidence(prior, &stats.observed_destinations(j, x));
            }
        }
    }
    total
}
