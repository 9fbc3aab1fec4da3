//! Transition counts and sojourn times for temporal (feature) nodes.
//!
//! Each consecutive pair of observations is one interval. The node and its
//! parents are read at the earlier timestamp; the elapsed time always goes
//! to the sojourn of the "from" state, and a changed value at the later
//! timestamp counts one transition and one leave. A later value outside the
//! domain still credits the sojourn; only its transition is skipped.

use super::{report_skip, SkipReason, UpdateOutcome};
use crate::dataset::BoundDataset;
use crate::graph::ParentConfig;

/// `M[j][x][y]`, `M[j][x]` and `T[j][x]`, priors included.
#[derive(Debug, Clone, PartialEq)]
pub struct CtbnStatistics {
    parents: ParentConfig,
    cardinality: usize,
    transition_prior: f64,
    leave_prior: f64,
    sojourn_prior: f64,
    transitions: Vec<f64>,
    leaves: Vec<f64>,
    sojourn: Vec<f64>,
    skipped: u64,
}

impl CtbnStatistics {
    /// Transition cells get `m_prior / (q·r·(r−1))` (the diagonal stays 0),
    /// leave cells the sum of their row, sojourn cells `t_prior / (q·r)`.
    pub fn new(parents: ParentConfig, cardinality: usize, m_prior: f64, t_prior: f64) -> Self {
        let q = parents.count();
        let r = cardinality;
        let cells = (q * r) as f64;
        let transition_prior = if r > 1 && cells > 0.0 {
            m_prior / (cells * (r - 1) as f64)
        } else {
            0.0
        };
        let leave_prior = transition_prior * r.saturating_sub(1) as f64;
        let sojourn_prior = if cells > 0.0 { t_prior / cells } else { 0.0 };

        let mut transitions = vec![0.0; q * r * r];
        for j in 0..q {
            for x in 0..r {
                for y in 0..r {
                    if x != y {
                        transitions[(j * r + x) * r + y] = transition_prior;
                    }
                }
            }
        }

        CtbnStatistics {
            parents,
            cardinality,
            transition_prior,
            leave_prior,
            sojourn_prior,
            transitions,
            leaves: vec![leave_prior; q * r],
            sojourn: vec![sojourn_prior; q * r],
            skipped: 0,
        }
    }

    /// One pass over every interval of every sequence.
    pub fn accumulate(
        node: usize,
        parents: ParentConfig,
        cardinality: usize,
        m_prior: f64,
        t_prior: f64,
        data: &BoundDataset,
    ) -> Self {
        let mut stats = Self::new(parents, cardinality, m_prior, t_prior);
        for sequence in data.sequences() {
            for (i, elapsed) in sequence.intervals() {
                let j = stats.parents.index(|p| sequence.value(i, p));
                let from = sequence.value(i, node);
                let to = sequence.value(i + 1, node);
                if let UpdateOutcome::Skipped(reason) = stats.update(j, from, to, elapsed) {
                    report_skip(data.log_context(), node, reason);
                }
            }
        }
        stats
    }

    /// Add one interval of length `elapsed` starting in `from`.
    pub fn update(
        &mut self,
        parent_index: Option<usize>,
        from: Option<usize>,
        to: Option<usize>,
        elapsed: f64,
    ) -> UpdateOutcome {
        let r = self.cardinality;
        let Some(j) = parent_index.filter(|&j| j < self.parents.count()) else {
            self.skipped += 1;
            return UpdateOutcome::Skipped(SkipReason::UnseenParentConfiguration);
        };
        let Some(x) = from.filter(|&x| x < r) else {
            self.skipped += 1;
            return UpdateOutcome::Skipped(SkipReason::UnseenNodeState);
        };
        self.sojourn[j * r + x] += elapsed;
        let Some(y) = to.filter(|&y| y < r) else {
            self.skipped += 1;
            return UpdateOutcome::Skipped(SkipReason::UnseenDestination);
        };

        if x != y {
            self.transitions[(j * r + x) * r + y] += 1.0;
            self.leaves[j * r + x] += 1.0;
        }
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

    /// Leave count of `x` under configuration `j`, prior included.
    pub fn leave(&self, j: usize, x: usize) -> f64 {
        self.leaves[j * self.cardinality + x]
    }

    /// Time spent in `x` under configuration `j`, prior included.
    pub fn sojourn(&self, j: usize, x: usize) -> f64 {
        self.sojourn[j * self.cardinality + x]
    }

    /// Transition counts out of `x` under configuration `j`, prior included.
    pub fn transition_row(&self, j: usize, x: usize) -> &[f64] {
        let r = self.cardinality;
        &self.transitions[(j * r + x) * r..(j * r + x + 1) * r]
    }

    pub fn observed_leave(&self, j: usize, x: usize) -> f64 {
        (self.leave(j, x) - self.leave_prior).max(0.0)
    }

    pub fn observed_sojourn(&self, j: usize, x: usize) -> f64 {
        (self.sojourn(j, x) - self.sojourn_prior).max(0.0)
    }

    pub fn observed_transition(&self, j: usize, x: usize, y: usize) -> f64 {
        if x == y {
            return 0.0;
        }
        (self.transition_row(j, x)[y] - self.transition_prior).max(0.0)
    }

    /// Observed destination counts out of `x`, the source itself left out.
    pub fn observed_destinations(&self, j: usize, x: usize) -> Vec<f64> {
        (0..self.cardinality)
            .filter(|&y| y != x)
            .map(|y| self.observed_transition(j, x, y))
            .collect()
    }

    pub fn transition_prior(&self) -> f64 {
        self.transition_prior
    }

    pub fn leave_prior(&self) -> f64 {
        self.leave_prior
    }

    pub fn sojourn_prior(&self) -> f64 {
        self.sojourn_prior
    }

    /// Observed transitions of the node over every configuration.
    pub fn total_observed_transitions(&self) -> f64 {
        let r = self.cardinality;
        (0..self.num_configurations())
            .flat_map(|j| (0..r).map(move |x| (j, x)))
            .map(|(j, x)| self.observed_leave(j, x))
            .sum()
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// `q·r` leaving rates plus `q·r·(r − 2)` free destination probabilities.
    pub fn free_parameters(&self) -> usize {
        self.num_configurations() * self.cardinality * self.cardinality.saturating_sub(1)
    }
}
