//! Structure search.
//!
//! All strategies share one state machine: start from a seed structure,
//! propose legal single-edge moves, score them, accept or reject, and stop at
//! a local optimum or an iteration cap.
//!
//! - [`hill_climbing`]: greedy best-improvement search, either over the whole
//!   graph or independently per node when the score decomposes, with seeded
//!   random restarts.
//! - [`tabu`]: best admissible move even when it does not improve, with the
//!   inverses of recent moves forbidden for a fixed number of steps.
//! - [`constraint`]: PC for the class network and CTPC for the features,
//!   removing edges whose conditional-independence tests keep the null.
//! - [`hybrid`]: constraint-based restriction of the candidate parents, then
//!   hill climbing inside that skeleton.

pub mod constraint;
pub mod hill_climbing;
pub mod hybrid;
pub mod tabu;

use crate::graph::{AdjacencyMatrix, Constraints};
use crate::score::StructureScore;
use fixedbitset::FixedBitSet;
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Smallest score gain counted as an improvement.
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// A single-edge move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Add { from: usize, to: usize },
    Delete { from: usize, to: usize },
    Reverse { from: usize, to: usize },
}

impl Operation {
    /// The move that undoes this one.
    pub fn inverse(&self) -> Operation {
        match *self {
            Operation::Add { from, to } => Operation::Delete { from, to },
            Operation::Delete { from, to } => Operation::Add { from, to },
            Operation::Reverse { from, to } => Operation::Reverse { from: to, to: from },
        }
    }

    pub fn apply(&self, adjacency: &mut AdjacencyMatrix) {
        match *self {
            Operation::Add { from, to } => adjacency.add_edge(from, to),
            Operation::Delete { from, to } => adjacency.remove_edge(from, to),
            Operation::Reverse { from, to } => adjacency.reverse_edge(from, to),
        }
    }

    /// Nodes whose parent set the move changes.
    pub fn affected(&self) -> impl Iterator<Item = usize> {
        let (first, second) = match *self {
            Operation::Add { to, .. } | Operation::Delete { to, .. } => (to, None),
            Operation::Reverse { from, to } => (to, Some(from)),
        };
        std::iter::once(first).chain(second)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Add { from, to } => write!(f, "add {from}->{to}"),
            Operation::Delete { from, to } => write!(f, "delete {from}->{to}"),
            Operation::Reverse { from, to } => write!(f, "reverse {from}->{to}"),
        }
    }
}

/// One accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchStep {
    pub iteration: usize,
    pub operation: Operation,
    /// Score after the move.
    pub score: f64,
}

/// Result of a search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub adjacency: AdjacencyMatrix,
    /// Final score; NaN for score-free searches.
    pub score: f64,
    pub iterations: usize,
    /// Accepted moves of the run that produced `adjacency`.
    pub trace: Vec<SearchStep>,
}

impl SearchOutcome {
    pub fn unscored(adjacency: AdjacencyMatrix) -> Self {
        SearchOutcome {
            adjacency,
            score: f64::NAN,
            iterations: 0,
            trace: Vec::new(),
        }
    }
}

/// Every legal move within the edit mask, in a fixed order.
pub fn neighbours(adjacency: &AdjacencyMatrix, constraints: &Constraints) -> Vec<Operation> {
    let mut ops = Vec::new();
    for to in constraints.editable_nodes() {
        for from in 0..adjacency.len() {
            let candidates: &[Operation] = if adjacency.has_edge(from, to) {
                &[Operation::Delete { from, to }, Operation::Reverse { from, to }]
            } else if constraints.is_allowed(from, to) {
                &[Operation::Add { from, to }]
            } else {
                &[]
            };
            ops.extend(
                candidates
                    .iter()
                    .copied()
                    .filter(|op| constraints.check_operation(adjacency, *op).is_legal()),
            );
        }
    }
    ops
}

/// Local scores keyed by node and parent set.
pub(crate) type LocalCache = HashMap<(usize, FixedBitSet), f64>;

/// A scored candidate move and the local scores computed for it.
pub(crate) struct Candidate {
    pub operation: Operation,
    pub delta: f64,
    pub computed: Vec<((usize, FixedBitSet), f64)>,
}

/// Score of the structure, from cached local scores when the score decomposes.
pub(crate) fn current_score(
    score: &dyn StructureScore,
    adjacency: &AdjacencyMatrix,
    cache: &mut LocalCache,
) -> f64 {
    if !score.is_decomposable() {
        return score.structure_score(adjacency);
    }
    score
        .scope()
        .iter()
        .map(|&node| {
            let key = (node, adjacency.parents(node).clone());
            if let Some(&cached) = cache.get(&key) {
                return cached;
            }
            let value = score.local_score(node, &key.1).unwrap_or(f64::NEG_INFINITY);
            cache.insert(key, value);
            value
        })
        .sum()
}

/// Score every move in parallel against a read-only cache snapshot.
///
/// Results keep the order of `ops`.
pub(crate) fn evaluate(
    score: &dyn StructureScore,
    adjacency: &AdjacencyMatrix,
    current: f64,
    ops: &[Operation],
    cache: &LocalCache,
) -> Vec<Candidate> {
    ops.par_iter()
        .map(|&operation| {
            let mut next = adjacency.clone();
            operation.apply(&mut next);
            if !score.is_decomposable() {
                return Candidate {
                    operation,
                    delta: score.structure_score(&next) - current,
                    computed: Vec::new(),
                };
            }

            let mut computed = Vec::new();
            let mut local = |node: usize, parents: &FixedBitSet| {
                let key = (node, parents.clone());
                if let Some(&cached) = cache.get(&key) {
                    return cached;
                }
                let value = score.local_score(node, parents).unwrap_or(f64::NEG_INFINITY);
                computed.push((key, value));
                value
            };
            let mut delta = 0.0;
            for node in operation.affected() {
                delta += local(node, next.parents(node)) - local(node, adjacency.parents(node));
            }
            Candidate {
                operation,
                delta,
                computed,
            }
        })
        .collect()
}

/// Highest-delta candidate; the earliest on ties.
pub(crate) fn best_candidate(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(b) if !(candidate.delta > b.delta) => Some(b),
        _ if candidate.delta.is_nan() => best,
        _ => Some(candidate),
    })
}

/// Seed of one restart (and node, for per-node searches).
pub fn restart_seed(seed: u64, restart: usize, node: usize) -> u64 {
    seed.wrapping_add((restart as u64) << 32)
        .wrapping_add(node as u64)
}

/// Apply `moves` random legal moves.
pub fn perturb(
    adjacency: &AdjacencyMatrix,
    constraints: &Constraints,
    moves: usize,
    rng: &mut StdRng,
) -> AdjacencyMatrix {
    let mut perturbed = adjacency.clone();
    for _ in 0..moves {
        let ops = neighbours(&perturbed, constraints);
        if ops.is_empty() {
            break;
        }
        ops[rng.random_range(0..ops.len())].apply(&mut perturbed);
    }
    perturbed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    fn kinds() -> Vec<NodeKind> {
        vec![NodeKind::Class, NodeKind::Class, NodeKind::Feature]
    }

    #[test]
    fn test_inverse_round_trip() {
        let ops = [
            Operation::Add { from: 0, to: 1 },
            Operation::Delete { from: 2, to: 1 },
            Operation::Reverse { from: 0, to: 2 },
        ];
        for op in ops {
            assert_eq!(op.inverse().inverse(), op);
        }
        assert_eq!(
            Operation::Reverse { from: 0, to: 2 }.inverse(),
            Operation::Reverse { from: 2, to: 0 }
        );
    }

    #[test]
    fn test_apply_then_inverse_restores() {
        let mut adj = AdjacencyMatrix::new(3);
        adj.add_edge(0, 1);
        let original = adj.clone();
        let op = Operation::Reverse { from: 0, to: 1 };
        op.apply(&mut adj);
        op.inverse().apply(&mut adj);
        assert_eq!(adj, original);
    }

    #[test]
    fn test_affected_nodes() {
        let add: Vec<usize> = Operation::Add { from: 0, to: 2 }.affected().collect();
        assert_eq!(add, vec![2]);
        let rev: Vec<usize> = Operation::Reverse { from: 0, to: 1 }.affected().collect();
        assert_eq!(rev, vec![1, 0]);
    }

    #[test]
    fn test_neighbours_are_legal() {
        let constraints = Constraints::new(kinds(), None);
        let mut adj = AdjacencyMatrix::new(3);
        adj.add_edge(0, 1);
        let ops = neighbours(&adj, &constraints);
        assert!(ops.contains(&Operation::Delete { from: 0, to: 1 }));
        assert!(ops.contains(&Operation::Reverse { from: 0, to: 1 }));
        assert!(!ops.contains(&Operation::Add { from: 1, to: 0 }));
        assert!(!ops.contains(&Operation::Add { from: 2, to: 0 }));
        for op in ops {
            let mut next = adj.clone();
            op.apply(&mut next);
            assert!(constraints.check(&next).is_legal(), "{op}");
        }
    }

    #[test]
    fn test_perturb_is_seeded() {
        let constraints = Constraints::new(kinds(), None);
        let start = AdjacencyMatrix::new(3);
        let a = perturb(&start, &constraints, 3, &mut StdRng::seed_from_u64(7));
        let b = perturb(&start, &constraints, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(constraints.check(&a).is_legal());
    }

    #[test]
    fn test_restart_seeds_distinct() {
        assert_ne!(restart_seed(1, 1, 2), restart_seed(1, 2, 1));
        assert_eq!(restart_seed(5, 0, 0), 5);
    }
}
