//! State counts for static (class) nodes.

use super::{report_skip, SkipReason, UpdateOutcome};
use crate::dataset::BoundDataset;
use crate::graph::ParentConfig;

/// `N[parent configuration][state]`, prior included.
#[derive(Debug, Clone, PartialEq)]
pub struct BnStatistics {
    parents: ParentConfig,
    cardinality: usize,
    prior: f64,
    counts: Vec<f64>,
    skipped: u64,
}

impl BnStatistics {
    /// Arrays pre-filled with `n_prior / (q·r)` per cell.
    pub fn new(parents: ParentConfig, cardinality: usize, n_prior: f64) -> Self {
        let cells = parents.count() * cardinality;
        let prior = if cells > 0 { n_prior / cells as f64 } else { 0.0 };
        BnStatistics {
            parents,
            cardinality,
            prior,
            counts: vec![prior; cells],
            skipped: 0,
        }
    }

    /// Count the first observation of every sequence.
    pub fn accumulate(
        node: usize,
        parents: ParentConfig,
        cardinality: usize,
        n_prior: f64,
        data: &BoundDataset,
    ) -> Self {
        let mut stats = Self::new(parents, cardinality, n_prior);
        for sequence in data.sequences() {
            if sequence.is_empty() {
                continue;
            }
            let j = stats.parents.index(|p| sequence.value(0, p));
            let outcome = stats.update(j, sequence.value(0, node));
            if let UpdateOutcome::Skipped(reason) = outcome {
                report_skip(data.log_context(), node, reason);
            }
        }
        stats
    }

    /// Add one observation.
    pub fn update(&mut self, parent_index: Option<usize>, state: Option<usize>) -> UpdateOutcome {
        let Some(j) = parent_index.filter(|&j| j < self.parents.count()) else {
            self.skipped += 1;
            return UpdateOutcome::Skipped(SkipReason::UnseenParentConfiguration);
        };
        let Some(k) = state.filter(|&k| k < self.cardinality) else {
            self.skipped += 1;
            return UpdateOutcome::Skipped(SkipReason::UnseenNodeState);
        };
        self.counts[j * self.cardinality + k] += 1.0;
        UpdateOutcome::Applied
    }

    pub fn parents(&self) -> &ParentConfig {
        &self.parents
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn num_configurations(&self) -> usize {
        self.parents.count()
    }

    /// Pseudo-count of every cell.
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Counts of one parent configuration, prior included.
    pub fn row(&self, j: usize) -> &[f64] {
        &self.counts[j * self.cardinality..(j + 1) * self.cardinality]
    }

    /// Observed count of one cell, prior excluded.
    pub fn observed(&self, j: usize, k: usize) -> f64 {
        (self.counts[j * self.cardinality + k] - self.prior).max(0.0)
    }

    /// Observed counts of one parent configuration.
    pub fn observed_row(&self, j: usize) -> Vec<f64> {
        (0..self.cardinality).map(|k| self.observed(j, k)).collect()
    }

    pub fn total_observed(&self) -> f64 {
        (0..self.num_configurations())
            .map(|j| self.observed_row(j).iter().sum::<f64>())
            .sum()
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// `q·(r − 1)`
    pub fn free_parameters(&self) -> usize {
        self.num_configurations() * self.cardinality.saturating_sub(1)
    }
}
