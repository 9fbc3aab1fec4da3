//! Parameter estimation from sufficient statistics.
//!
//! Static nodes get a conditional probability table, temporal nodes a
//! conditional intensity model: a leaving rate per (parent configuration,
//! state) and a destination distribution per row excluding the source state.
//! Every ratio with a zero denominator yields 0.
//!
//! The estimator only decides the pseudo-counts the statistics start from;
//! maximum likelihood and Bayesian estimation share the normalization.

use crate::dataset::BoundDataset;
use crate::graph::{AdjacencyMatrix, FittedNode, Node, NodeKind, NodeModel, ParentConfig};
use crate::stats::{BnStatistics, CtbnStatistics};
use mctbn_config::EstimatorConfig;
use mctbn_math::ln_or_neg_inf;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[inline]
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Conditional probability table, rows indexed by parent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpt {
    parents: ParentConfig,
    cardinality: usize,
    probabilities: Vec<f64>,
}

impl Cpt {
    pub fn from_statistics(stats: &BnStatistics) -> Self {
        let r = stats.cardinality();
        let mut probabilities = Vec::with_capacity(stats.num_configurations() * r);
        for j in 0..stats.num_configurations() {
            let row = stats.row(j);
            let total: f64 = row.iter().sum();
            probabilities.extend(row.iter().map(|&n| ratio(n, total)));
        }
        Cpt {
            parents: stats.parents().clone(),
            cardinality: r,
            probabilities,
        }
    }

    pub fn parents(&self) -> &ParentConfig {
        &self.parents
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn probability(&self, j: usize, k: usize) -> f64 {
        self.probabilities[j * self.cardinality + k]
    }

    pub fn log_probability(&self, j: usize, k: usize) -> f64 {
        ln_or_neg_inf(self.probability(j, k))
    }

    pub fn row(&self, j: usize) -> &[f64] {
        &self.probabilities[j * self.cardinality..(j + 1) * self.cardinality]
    }
}

/// Conditional intensity model of one temporal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cim {
    parents: ParentConfig,
    cardinality: usize,
    /// `q[j][x]`
    rates: Vec<f64>,
    /// `θ[j][x][y]`, zero on the diagonal.
    destinations: Vec<f64>,
}

impl Cim {
    pub fn from_statistics(stats: &CtbnStatistics) -> Self {
        let r = stats.cardinality();
        let q = stats.num_configurations();
        let mut rates = Vec::with_capacity(q * r);
        let mut destinations = Vec::with_capacity(q * r * r);
        for j in 0..q {
            for x in 0..r {
                let leave = stats.leave(j, x);
                rates.push(ratio(leave, stats.sojourn(j, x)));
                for (y, &m) in stats.transition_row(j, x).iter().enumerate() {
                    destinations.push(if y == x { 0.0 } else { ratio(m, leave) });
                }
            }
        }
        Cim {
            parents: stats.parents().clone(),
            cardinality: r,
            rates,
            destinations,
        }
    }

    pub fn parents(&self) -> &ParentConfig {
        &self.parents
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn rate(&self, j: usize, x: usize) -> f64 {
        self.rates[j * self.cardinality + x]
    }

    pub fn destination(&self, j: usize, x: usize, y: usize) -> f64 {
        let r = self.cardinality;
        self.destinations[(j * r + x) * r + y]
    }

    pub fn destination_row(&self, j: usize, x: usize) -> &[f64] {
        let r = self.cardinality;
        &self.destinations[(j * r + x) * r..(j * r + x + 1) * r]
    }

    /// Intensity matrix of configuration `j`: `q_x·θ_xy` off the diagonal,
    /// `−q_x` on it.
    pub fn intensity_matrix(&self, j: usize) -> Vec<Vec<f64>> {
        let r = self.cardinality;
        (0..r)
            .map(|x| {
                (0..r)
                    .map(|y| {
                        if x == y {
                            -self.rate(j, x)
                        } else {
                            self.rate(j, x) * self.destination(j, x, y)
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Log density of staying in `x` for `elapsed` and then being in `to`.
    #[inline]
    pub fn log_interval_density(&self, j: usize, x: usize, to: usize, elapsed: f64) -> f64 {
        let rate = self.rate(j, x);
        let mut density = -rate * elapsed;
        if to != x {
            density += ln_or_neg_inf(rate) + ln_or_neg_inf(self.destination(j, x, to));
        }
        density
    }
}

/// Pseudo-counts of one estimation method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterEstimator {
    n_prior: f64,
    m_prior: f64,
    t_prior: f64,
}

impl ParameterEstimator {
    pub fn maximum_likelihood() -> Self {
        ParameterEstimator {
            n_prior: 0.0,
            m_prior: 0.0,
            t_prior: 0.0,
        }
    }

    pub fn bayesian(n_prior: f64, m_prior: f64, t_prior: f64) -> Self {
        ParameterEstimator {
            n_prior,
            m_prior,
            t_prior,
        }
    }

    pub fn from_config(config: &EstimatorConfig) -> Self {
        let (n_prior, m_prior, t_prior) = config.priors();
        Self::bayesian(n_prior, m_prior, t_prior)
    }

    pub fn bn_statistics(
        &self,
        node: usize,
        parents: ParentConfig,
        cardinality: usize,
        data: &BoundDataset,
    ) -> BnStatistics {
        BnStatistics::accumulate(node, parents, cardinality, self.n_prior, data)
    }

    pub fn ctbn_statistics(
        &self,
        node: usize,
        parents: ParentConfig,
        cardinality: usize,
        data: &BoundDataset,
    ) -> CtbnStatistics {
        CtbnStatistics::accumulate(node, parents, cardinality, self.m_prior, self.t_prior, data)
    }

    /// Fit one node under the given parent set.
    pub fn fit(&self, node: &Node, parents: ParentConfig, data: &BoundDataset) -> NodeModel {
        match node.kind {
            NodeKind::Class => {
                let stats = self.bn_statistics(node.index, parents, node.cardinality(), data);
                let cpt = Cpt::from_statistics(&stats);
                NodeModel::Bn { stats, cpt }
            }
            NodeKind::Feature => {
                let stats = self.ctbn_statistics(node.index, parents, node.cardinality(), data);
                let cim = Cim::from_statistics(&stats);
                NodeModel::Ctbn { stats, cim }
            }
        }
    }

    /// Fit every node of `nodes` under `adjacency`, one task per node.
    pub fn fit_all(
        &self,
        nodes: &[Node],
        cardinalities: &[usize],
        adjacency: &AdjacencyMatrix,
        data: &BoundDataset,
    ) -> Vec<FittedNode> {
        nodes
            .par_iter()
            .map(|node| {
                let parents = ParentConfig::from_bits(adjacency.parents(node.index), cardinalities);
                FittedNode {
                    node: node.clone(),
                    model: self.fit(node, parents, data),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn ctbn_stats(m_prior: f64, t_prior: f64) -> CtbnStatistics {
        let parents = ParentConfig::new(vec![0], &[2]);
        let mut stats = CtbnStatistics::new(parents, 3, m_prior, t_prior);
        stats.update(Some(0), Some(0), Some(1), 1.0);
        stats.update(Some(0), Some(1), Some(2), 0.5);
        stats.update(Some(0), Some(2), Some(0), 2.0);
        stats.update(Some(0), Some(0), Some(2), 1.0);
        stats.update(Some(0), Some(0), Some(0), 3.0);
        stats
    }

    #[test]
    fn test_cpt_rows_sum_to_one() {
        let parents = ParentConfig::new(vec![0], &[3]);
        let mut stats = BnStatistics::new(parents, 2, 1.0);
        stats.update(Some(0), Some(1));
        stats.update(Some(2), Some(0));
        let cpt = Cpt::from_statistics(&stats);
        for j in 0..3 {
            assert!(approx_eq(cpt.row(j).iter().sum::<f64>(), 1.0, 1e-12));
        }
    }

    #[test]
    fn test_unseen_configuration_gives_zero() {
        let parents = ParentConfig::new(vec![0], &[2]);
        let mut stats = BnStatistics::new(parents, 2, 0.0);
        stats.update(Some(0), Some(1));
        let cpt = Cpt::from_statistics(&stats);
        assert_eq!(cpt.row(1), &[0.0, 0.0]);
        assert_eq!(cpt.log_probability(1, 0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_cim_rates_and_destinations() {
        let cim = Cim::from_statistics(&ctbn_stats(0.0, 0.0));
        assert!(approx_eq(cim.rate(0, 0), 2.0 / 5.0, 1e-12));
        assert!(approx_eq(cim.destination(0, 0, 1), 0.5, 1e-12));
        assert!(approx_eq(cim.destination(0, 0, 0), 0.0, 1e-12));
        // Unvisited configuration
        assert_eq!(cim.rate(1, 0), 0.0);
        assert_eq!(cim.destination_row(1, 0), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_destination_rows_sum_to_one() {
        let cim = Cim::from_statistics(&ctbn_stats(1.0, 1.0));
        for j in 0..2 {
            for x in 0..3 {
                let row = cim.destination_row(j, x);
                assert!(approx_eq(row.iter().sum::<f64>(), 1.0, 1e-12));
                assert_eq!(row[x], 0.0);
            }
        }
    }

    #[test]
    fn test_intensity_matrix_rows_sum_to_zero() {
        let cim = Cim::from_statistics(&ctbn_stats(1.0, 1.0));
        for row in cim.intensity_matrix(0) {
            assert!(approx_eq(row.iter().sum::<f64>(), 0.0, 1e-12));
        }
    }

    #[test]
    fn test_maximum_likelihood_is_limit_of_bayesian() {
        let ml = Cim::from_statistics(&ctbn_stats(0.0, 0.0));
        let mut previous = f64::INFINITY;
        for eps in [1e-1, 1e-3, 1e-6] {
            let bayes = Cim::from_statistics(&ctbn_stats(eps, eps));
            let gap = (0..3)
                .map(|x| (bayes.rate(0, x) - ml.rate(0, x)).abs())
                .chain((0..3).map(|y| (bayes.destination(0, 0, y) - ml.destination(0, 0, y)).abs()))
                .fold(0.0, f64::max);
            assert!(gap <= previous);
            previous = gap;
        }
        assert!(previous < 1e-5);
    }

    #[test]
    fn test_interval_density() {
        let cim = Cim::from_statistics(&ctbn_stats(0.0, 0.0));
        let q = cim.rate(0, 0);
        assert!(approx_eq(cim.log_interval_density(0, 0, 0, 2.0), -2.0 * q, 1e-12));
        let expected = -q + q.ln() + 0.5f64.ln();
        assert!(approx_eq(cim.log_interval_density(0, 0, 1, 1.0), expected, 1e-12));
        assert_eq!(cim.log_interval_density(1, 0, 1, 1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_estimator_from_config() {
        let est = ParameterEstimator::from_config(&EstimatorConfig::MaximumLikelihood);
        assert_eq!(est, ParameterEstimator::maximum_likelihood());
    }
}
