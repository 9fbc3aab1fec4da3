//! Exact inference over class configurations.
//!
//! The class space is small enough to enumerate: for each joint class
//! configuration `c`, the log joint of a sequence is
//!
//! ```text
//! ln P(c) + Σ_features Σ_intervals ln f(interval | parents, c)
//! ```
//!
//! where `P(c)` comes from the class network and `f` is the CTBN density of
//! one interval (survival in the current state, then the observed
//! transition). Posteriors are the log joints normalized with log-sum-exp.

use crate::dataset::BoundSequence;
use crate::estimate::Cim;
use crate::graph::FittedNode;
use itertools::Itertools;
use mctbn_common::State;
use mctbn_math::{log_sum_exp, normalize_log_probs};

/// Every joint configuration of the class variables with its prior.
///
/// Class nodes occupy indices `0..len()` of the node arena, so a
/// configuration doubles as the class part of a node-state vector.
#[derive(Debug, Clone)]
pub struct ClassSpace {
    names: Vec<String>,
    domains: Vec<Vec<String>>,
    configurations: Vec<Vec<usize>>,
    log_priors: Vec<f64>,
}

impl ClassSpace {
    /// Enumerate configurations from fitted class nodes, in index order.
    pub fn new(class_nodes: &[FittedNode]) -> Self {
        let names = class_nodes.iter().map(|n| n.node.name.clone()).collect();
        let domains: Vec<Vec<String>> = class_nodes.iter().map(|n| n.node.domain.clone()).collect();
        let configurations: Vec<Vec<usize>> = domains
            .iter()
            .map(|d| 0..d.len())
            .multi_cartesian_product()
            .collect();
        let log_priors = configurations
            .iter()
            .map(|values| {
                class_nodes
                    .iter()
                    .map(|fitted| match fitted.model.cpt() {
                        Some(cpt) => cpt
                            .parents()
                            .index(|p| values.get(p).copied())
                            .map_or(f64::NEG_INFINITY, |j| {
                                cpt.log_probability(j, values[fitted.node.index])
                            }),
                        None => f64::NEG_INFINITY,
                    })
                    .sum()
            })
            .collect();
        ClassSpace {
            names,
            domains,
            configurations,
            log_priors,
        }
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn num_variables(&self) -> usize {
        self.names.len()
    }

    pub fn configuration(&self, c: usize) -> &[usize] {
        &self.configurations[c]
    }

    pub fn log_prior(&self, c: usize) -> f64 {
        self.log_priors[c]
    }

    pub fn log_priors(&self) -> &[f64] {
        &self.log_priors
    }

    /// Index of a configuration; the last variable varies fastest.
    pub fn index_of(&self, values: &[usize]) -> Option<usize> {
        if values.len() != self.domains.len() {
            return None;
        }
        let mut index = 0;
        for (value, domain) in values.iter().zip(&self.domains) {
            if *value >= domain.len() {
                return None;
            }
            index = index * domain.len() + value;
        }
        Some(index)
    }

    /// Class configuration recorded in a sequence, read from its first
    /// observation.
    pub fn observed(&self, sequence: &BoundSequence) -> Option<usize> {
        if sequence.is_empty() {
            return None;
        }
        let values: Option<Vec<usize>> = (0..self.num_variables())
            .map(|i| sequence.value(0, i))
            .collect();
        self.index_of(&values?)
    }

    /// Configuration as a variable-to-value assignment.
    pub fn state(&self, c: usize) -> State {
        State::new(
            self.configurations[c]
                .iter()
                .enumerate()
                .map(|(i, &v)| (self.names[i].clone(), self.domains[i][v].clone())),
        )
    }
}

/// Log density of one feature's trajectory under a class configuration.
///
/// Class parents read `class_values`; feature parents and the feature itself
/// read the sequence. Any unknown state or parent configuration makes the
/// configuration impossible.
pub fn feature_log_likelihood(
    node: usize,
    cim: &Cim,
    sequence: &BoundSequence,
    class_values: &[usize],
) -> f64 {
    let read = |i: usize, p: usize| {
        if p < class_values.len() {
            Some(class_values[p])
        } else {
            sequence.value(i, p)
        }
    };

    let mut total = 0.0;
    for (i, elapsed) in sequence.intervals() {
        let j = cim.parents().index(|p| read(i, p));
        let (Some(j), Some(x), Some(y)) = (j, read(i, node), read(i + 1, node)) else {
            return f64::NEG_INFINITY;
        };
        total += cim.log_interval_density(j, x, y, elapsed);
        if total == f64::NEG_INFINITY {
            break;
        }
    }
    total
}

/// Unnormalized log posterior of every class configuration.
pub fn log_joint(space: &ClassSpace, features: &[(usize, &Cim)], sequence: &BoundSequence) -> Vec<f64> {
    (0..space.len())
        .map(|c| {
            let prior = space.log_prior(c);
            if prior == f64::NEG_INFINITY {
                return prior;
            }
            let values = space.configuration(c);
            features.iter().fold(prior, |acc, &(node, cim)| {
                if acc == f64::NEG_INFINITY {
                    acc
                } else {
                    acc + feature_log_likelihood(node, cim, sequence, values)
                }
            })
        })
        .collect()
}

/// Posterior over class configurations.
#[derive(Debug, Clone, PartialEq)]
pub enum Posterior {
    /// Normalized joint of prior and feature likelihood.
    Exact(Vec<f64>),
    /// Every configuration had zero likelihood; the prior alone.
    PriorOnly(Vec<f64>),
}

impl Posterior {
    pub fn probabilities(&self) -> &[f64] {
        match self {
            Posterior::Exact(p) | Posterior::PriorOnly(p) => p,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Posterior::PriorOnly(_))
    }

    /// Most probable configuration; the first one on ties.
    pub fn argmax(&self) -> Option<(usize, f64)> {
        self.probabilities()
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (c, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((c, p)),
            })
    }
}

/// Posterior of one sequence, falling back to the prior (then to uniform)
/// when no configuration explains the observed trajectory.
pub fn posterior(space: &ClassSpace, features: &[(usize, &Cim)], sequence: &BoundSequence) -> Posterior {
    let joint = log_joint(space, features, sequence);
    if let Some(p) = normalize_log_probs(&joint) {
        return Posterior::Exact(p);
    }
    let prior = normalize_log_probs(space.log_priors())
        .unwrap_or_else(|| vec![1.0 / space.len().max(1) as f64; space.len()]);
    Posterior::PriorOnly(prior)
}

/// `ln P(c_true | features) = joint[c_true] − log Σ_c joint[c]`; `None` when
/// no configuration is possible.
pub fn conditional_log_likelihood(joint: &[f64], truth: usize) -> Option<f64> {
    let normalizer = log_sum_exp(joint);
    if normalizer == f64::NEG_INFINITY || normalizer.is_nan() {
        return None;
    }
    Some(joint[truth] - normalizer)
}
