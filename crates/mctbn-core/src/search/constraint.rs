//! Constraint-based structure search.
//!
//! Both variants start from every allowed edge and, for separating-set sizes
//! `0, 1, ..` up to the configured maximum, drop an edge as soon as one
//! separating set makes the endpoints look independent.
//!
//! Features (CTPC): a candidate parent `p` of feature `X` is tested against
//! subsets `S` of the other current parents of `X`. The statistics of `X`
//! under `S ∪ {p}` are compared, cell by cell, with those under `S`: an F
//! test on the leaving rates and, for more than two states, a chi-square test
//! on the destination counts. Any rejection keeps the edge.
//!
//! Classes (PC): chi-square tests on the first observation of each
//! sequence, then collider orientation from the separating sets, then the
//! remaining edges oriented by node index while the class graph stays
//! acyclic.

use super::SearchOutcome;
use crate::dataset::BoundDataset;
use crate::graph::{AdjacencyMatrix, Constraints, NodeKind, ParentConfig};
use crate::logging::{event_names, LogContext, Stage};
use crate::stats::CtbnStatistics;
use fixedbitset::FixedBitSet;
use itertools::Itertools;
use mctbn_config::ConstraintParams;
use mctbn_math::hypothesis::{contingency_test, time_to_transition_test, transition_distribution_test};
use rayon::prelude::*;
use std::collections::HashMap;

/// Undirected class skeleton and the sets that separated removed pairs.
struct Skeleton {
    neighbours: Vec<FixedBitSet>,
    separating: HashMap<(usize, usize), Vec<usize>>,
}

impl Skeleton {
    fn is_adjacent(&self, a: usize, b: usize) -> bool {
        self.neighbours[a].contains(b)
    }

    fn remove(&mut self, a: usize, b: usize, separating: Vec<usize>) {
        self.neighbours[a].set(b, false);
        self.neighbours[b].set(a, false);
        self.separating.insert((a.min(b), a.max(b)), separating);
    }

    fn separating_set(&self, a: usize, b: usize) -> Option<&Vec<usize>> {
        self.separating.get(&(a.min(b), a.max(b)))
    }
}

pub struct ConstraintSearch<'a> {
    data: &'a BoundDataset,
    cardinalities: Vec<usize>,
    constraints: &'a Constraints,
    params: ConstraintParams,
    context: LogContext,
}

impl<'a> ConstraintSearch<'a> {
    pub fn new(
        data: &'a BoundDataset,
        cardinalities: Vec<usize>,
        constraints: &'a Constraints,
        params: ConstraintParams,
    ) -> Self {
        ConstraintSearch {
            data,
            cardinalities,
            constraints,
            params,
            context: LogContext::fresh(),
        }
    }

    pub fn with_log_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    fn max_separating_set(&self) -> usize {
        self.params.max_separating_set.unwrap_or(usize::MAX)
    }

    fn editable(&self, kind: NodeKind) -> Vec<usize> {
        self.constraints
            .editable_nodes()
            .into_iter()
            .filter(|&n| self.constraints.kind(n) == kind)
            .collect()
    }

    /// Replace every editable column of `base` with the learned parents.
    pub fn run(&self, base: &AdjacencyMatrix) -> SearchOutcome {
        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_STARTED,
            Stage::Search,
            "constraint-based search",
            significance = self.params.significance,
            transition_significance = self.params.transition_significance
        );

        let mut adjacency = base.clone();
        let classes = self.editable(NodeKind::Class);
        if !classes.is_empty() {
            let skeleton = self.class_skeleton(&classes);
            self.orient_classes(&mut adjacency, &classes, &skeleton);
        }
        for (node, parents) in self.feature_parent_sets() {
            adjacency.set_parents(node, parents);
        }

        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_CONVERGED,
            Stage::Search,
            "constraint-based search finished",
            edges = adjacency.edge_count()
        );
        SearchOutcome::unscored(adjacency)
    }

    /// Edges that survive the independence tests, as an allowed-parents
    /// mask. Class pairs are allowed in both directions.
    pub fn mask(&self) -> Vec<FixedBitSet> {
        let n = self.constraints.len();
        let mut mask = vec![FixedBitSet::with_capacity(n); n];
        let classes = self.editable(NodeKind::Class);
        if !classes.is_empty() {
            let skeleton = self.class_skeleton(&classes);
            for &node in &classes {
                mask[node] = skeleton.neighbours[node].clone();
            }
        }
        for (node, parents) in self.feature_parent_sets() {
            mask[node] = parents;
        }
        mask
    }

    fn feature_parent_sets(&self) -> Vec<(usize, FixedBitSet)> {
        self.editable(NodeKind::Feature)
            .par_iter()
            .map(|&node| (node, self.feature_parents(node)))
            .collect()
    }

    /// CTPC for one feature.
    fn feature_parents(&self, node: usize) -> FixedBitSet {
        let mut parents: Vec<usize> = self.constraints.allowed_parents(node).ones().collect();
        let mut size = 0;
        while size <= self.max_separating_set() && size < parents.len() {
            for candidate in parents.clone() {
                let others: Vec<usize> = parents.iter().copied().filter(|&p| p != candidate).collect();
                let separating = others
                    .into_iter()
                    .combinations(size)
                    .find(|s| !self.is_feature_dependent(node, candidate, s));
                if let Some(separating) = separating {
                    parents.retain(|&p| p != candidate);
                    crate::log_event!(
                        self.context,
                        DEBUG,
                        event_names::SEARCH_EDGE_REMOVED,
                        Stage::Search,
                        "edge removed",
                        from = candidate,
                        to = node,
                        separating_set_size = separating.len()
                    );
                }
            }
            size += 1;
        }

        let mut bits = FixedBitSet::with_capacity(self.constraints.len());
        bits.extend(parents);
        bits
    }

    fn is_feature_dependent(&self, node: usize, candidate: usize, separating: &[usize]) -> bool {
        let r = self.cardinalities[node];
        let time_alpha = self.params.significance;
        let transition_alpha = self.params.transition_significance;
        if time_alpha >= 1.0 {
            return true;
        }
        if time_alpha <= 0.0 && (r <= 2 || transition_alpha <= 0.0) {
            return false;
        }

        let mut with: Vec<usize> = separating.to_vec();
        with.push(candidate);
        with.sort_unstable();
        let mut without = separating.to_vec();
        without.sort_unstable();

        let stats_with = CtbnStatistics::accumulate(
            node,
            ParentConfig::new(with, &self.cardinalities),
            r,
            0.0,
            0.0,
            self.data,
        );
        let stats_without = CtbnStatistics::accumulate(
            node,
            ParentConfig::new(without, &self.cardinalities),
            r,
            0.0,
            0.0,
            self.data,
        );

        let with_parents = stats_with.parents();
        for j in 0..stats_with.num_configurations() {
            let values = with_parents.decode(j);
            let Some(k) = stats_without.parents().index(|p| {
                with_parents
                    .parents()
                    .iter()
                    .position(|&q| q == p)
                    .map(|i| values[i])
            }) else {
                continue;
            };
            for x in 0..r {
                let time = time_to_transition_test(
                    stats_with.observed_leave(j, x),
                    stats_with.observed_sojourn(j, x),
                    stats_without.observed_leave(k, x),
                    stats_without.observed_sojourn(k, x),
                    time_alpha,
                );
                if time.is_rejected() {
                    return true;
                }
                if r > 2 {
                    let transition = transition_distribution_test(
                        &stats_with.observed_destinations(j, x),
                        &stats_without.observed_destinations(k, x),
                        transition_alpha,
                    );
                    if transition.is_rejected() {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// PC skeleton over the editable class nodes.
    fn class_skeleton(&self, classes: &[usize]) -> Skeleton {
        let n = self.constraints.len();
        let mut skeleton = Skeleton {
            neighbours: vec![FixedBitSet::with_capacity(n); n],
            separating: HashMap::new(),
        };
        for (&a, &b) in classes.iter().tuple_combinations() {
            if self.constraints.is_allowed(a, b) || self.constraints.is_allowed(b, a) {
                skeleton.neighbours[a].insert(b);
                skeleton.neighbours[b].insert(a);
            }
        }

        let mut size = 0;
        loop {
            if size > self.max_separating_set() {
                break;
            }
            let mut testable = false;
            for (&a, &b) in classes.iter().tuple_combinations() {
                if !skeleton.is_adjacent(a, b) {
                    continue;
                }
                let separated = [(a, b), (b, a)].into_iter().find_map(|(x, y)| {
                    let others: Vec<usize> = skeleton.neighbours[x].ones().filter(|&o| o != y).collect();
                    if others.len() < size {
                        return None;
                    }
                    testable = true;
                    others
                        .into_iter()
                        .combinations(size)
                        .find(|s| !self.is_class_dependent(a, b, s))
                });
                if let Some(separating) = separated {
                    crate::log_event!(
                        self.context,
                        DEBUG,
                        event_names::SEARCH_EDGE_REMOVED,
                        Stage::Search,
                        "class edge removed",
                        from = a,
                        to = b,
                        separating_set_size = separating.len()
                    );
                    skeleton.remove(a, b, separating);
                }
            }
            if !testable {
                break;
            }
            size += 1;
        }
        skeleton
    }

    fn is_class_dependent(&self, a: usize, b: usize, separating: &[usize]) -> bool {
        let alpha = self.params.significance;
        if alpha >= 1.0 {
            return true;
        }
        if alpha <= 0.0 {
            return false;
        }

        let mut sorted = separating.to_vec();
        sorted.sort_unstable();
        let config = ParentConfig::new(sorted, &self.cardinalities);
        let (ra, rb) = (self.cardinalities[a], self.cardinalities[b]);
        let mut tables = vec![vec![vec![0.0; rb]; ra]; config.count()];
        for sequence in self.data.sequences() {
            if sequence.is_empty() {
                continue;
            }
            let cell = (
                config.index(|p| sequence.value(0, p)),
                sequence.value(0, a),
                sequence.value(0, b),
            );
            if let (Some(s), Some(x), Some(y)) = cell {
                if x < ra && y < rb {
                    tables[s][x][y] += 1.0;
                }
            }
        }
        contingency_test(&tables, alpha).is_rejected()
    }

    /// Direct the skeleton into the class columns of `adjacency`.
    fn orient_classes(&self, adjacency: &mut AdjacencyMatrix, classes: &[usize], skeleton: &Skeleton) {
        let n = adjacency.len();
        for &node in classes {
            adjacency.set_parents(node, FixedBitSet::with_capacity(n));
        }

        for &middle in classes {
            let around: Vec<usize> = skeleton.neighbours[middle].ones().collect();
            for (&a, &b) in around.iter().tuple_combinations() {
                if skeleton.is_adjacent(a, b) {
                    continue;
                }
                let unshielded_collider = skeleton
                    .separating_set(a, b)
                    .is_some_and(|s| !s.contains(&middle));
                if !unshielded_collider {
                    continue;
                }
                for from in [a, b] {
                    self.try_add(adjacency, from, middle);
                }
            }
        }

        for (&a, &b) in classes.iter().tuple_combinations() {
            if !skeleton.is_adjacent(a, b) || adjacency.has_edge(a, b) || adjacency.has_edge(b, a) {
                continue;
            }
            if !self.try_add(adjacency, a, b) {
                self.try_add(adjacency, b, a);
            }
        }
    }

    fn try_add(&self, adjacency: &mut AdjacencyMatrix, from: usize, to: usize) -> bool {
        if adjacency.has_edge(from, to) || adjacency.has_edge(to, from) {
            return adjacency.has_edge(from, to);
        }
        let op = super::Operation::Add { from, to };
        if self.constraints.check_operation(adjacency, op).is_legal() {
            op.apply(adjacency);
            true
        } else {
            false
        }
    }
}
