//! Greedy hill climbing with seeded random restarts.

use super::{
    best_candidate, current_score, evaluate, neighbours, perturb, restart_seed, LocalCache,
    Operation, SearchOutcome, SearchStep, IMPROVEMENT_EPSILON,
};
use crate::graph::{AdjacencyMatrix, Constraints, NodeKind};
use crate::logging::{event_names, LogContext, Stage};
use crate::score::StructureScore;
use fixedbitset::FixedBitSet;
use mctbn_config::HillClimbingParams;
use rand::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;

pub struct HillClimbing<'a> {
    score: &'a dyn StructureScore,
    constraints: &'a Constraints,
    params: HillClimbingParams,
    seed: u64,
    context: LogContext,
}

/// Best parent set found for one node.
struct ColumnClimb {
    node: usize,
    parents: FixedBitSet,
    score: f64,
    iterations: usize,
    trace: Vec<SearchStep>,
}

impl<'a> HillClimbing<'a> {
    pub fn new(
        score: &'a dyn StructureScore,
        constraints: &'a Constraints,
        params: HillClimbingParams,
    ) -> Self {
        HillClimbing {
            score,
            constraints,
            params,
            seed: 0,
            context: LogContext::fresh(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_log_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    /// Per-node search when the score decomposes and only feature columns
    /// are editable, global search otherwise.
    pub fn run(&self, initial: &AdjacencyMatrix) -> SearchOutcome {
        if self.supports_per_node() {
            self.run_per_node(initial)
        } else {
            self.run_global(initial)
        }
    }

    /// Class columns interact through the acyclicity rule, so only feature
    /// columns can be optimized independently.
    fn supports_per_node(&self) -> bool {
        self.score.is_decomposable()
            && self
                .constraints
                .editable_nodes()
                .iter()
                .all(|&n| self.constraints.kind(n) == NodeKind::Feature)
    }

    /// Best single move over the whole graph at every step.
    ///
    /// Restart `r` climbs from [`HillClimbing::restart_start`]; it replaces the
    /// best structure so far only with a strictly higher score.
    pub fn run_global(&self, initial: &AdjacencyMatrix) -> SearchOutcome {
        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_STARTED,
            Stage::Search,
            "global hill climbing",
            editable_nodes = self.constraints.editable_nodes().len(),
            restarts = self.params.random_restarts
        );

        let mut cache = LocalCache::new();
        let mut best = self.climb(initial.clone(), &mut cache);
        for restart in 1..=self.params.random_restarts {
            let start = self.restart_start(initial, restart);
            let candidate = self.climb(start, &mut cache);
            crate::log_event!(
                self.context,
                DEBUG,
                event_names::SEARCH_RESTART,
                Stage::Search,
                "restart finished",
                restart = restart,
                score = candidate.score,
                best = best.score
            );
            if candidate.score > best.score + IMPROVEMENT_EPSILON {
                best = candidate;
            }
        }

        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_CONVERGED,
            Stage::Search,
            "global hill climbing converged",
            score = best.score,
            iterations = best.iterations,
            edges = best.adjacency.edge_count()
        );
        best
    }

    /// Starting structure of restart `restart`: `restart_moves` random legal
    /// moves away from `initial`, drawn from `restart_seed(seed, restart, 0)`.
    pub fn restart_start(&self, initial: &AdjacencyMatrix, restart: usize) -> AdjacencyMatrix {
        let mut rng = StdRng::seed_from_u64(restart_seed(self.seed, restart, 0));
        perturb(initial, self.constraints, self.params.restart_moves, &mut rng)
    }

    fn climb(&self, mut adjacency: AdjacencyMatrix, cache: &mut LocalCache) -> SearchOutcome {
        let mut current = current_score(self.score, &adjacency, cache);
        let mut trace = Vec::new();

        while trace.len() < self.params.max_iterations {
            let ops = neighbours(&adjacency, self.constraints);
            let mut candidates = evaluate(self.score, &adjacency, current, &ops, cache);
            for candidate in &mut candidates {
                cache.extend(candidate.computed.drain(..));
            }
            let Some(best) = best_candidate(candidates) else {
                break;
            };
            if best.delta <= IMPROVEMENT_EPSILON {
                break;
            }

            best.operation.apply(&mut adjacency);
            current = if self.score.is_decomposable() {
                current_score(self.score, &adjacency, cache)
            } else {
                current + best.delta
            };
            let step = SearchStep {
                iteration: trace.len() + 1,
                operation: best.operation,
                score: current,
            };
            crate::log_event!(
                self.context,
                DEBUG,
                event_names::SEARCH_ITERATION,
                Stage::Search,
                "move accepted",
                iteration = step.iteration,
                operation = step.operation.to_string().as_str(),
                score = current
            );
            trace.push(step);
        }

        SearchOutcome {
            adjacency,
            score: current,
            iterations: trace.len(),
            trace,
        }
    }

    /// Optimize every editable column independently, in parallel.
    ///
    /// Each task owns a cache keyed by parent set and writes back only its
    /// own column. Trace scores are the node's local score.
    pub fn run_per_node(&self, initial: &AdjacencyMatrix) -> SearchOutcome {
        if !self.supports_per_node() {
            return self.run_global(initial);
        }
        let nodes = self.constraints.editable_nodes();
        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_STARTED,
            Stage::Search,
            "per-node hill climbing",
            editable_nodes = nodes.len(),
            restarts = self.params.random_restarts
        );

        let columns: Vec<ColumnClimb> = nodes
            .par_iter()
            .map(|&node| self.climb_node(node, initial.parents(node).clone()))
            .collect();

        let mut adjacency = initial.clone();
        let mut iterations = 0;
        let mut trace = Vec::new();
        for column in columns {
            tracing::debug!(
                target: event_names::SEARCH_CONVERGED,
                node = column.node,
                score = column.score,
                parents = column.parents.count_ones(..),
                "node converged"
            );
            adjacency.set_parents(column.node, column.parents);
            iterations += column.iterations;
            trace.extend(column.trace);
        }
        let score = self.score.structure_score(&adjacency);

        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_CONVERGED,
            Stage::Search,
            "per-node hill climbing converged",
            score = score,
            iterations = iterations,
            edges = adjacency.edge_count()
        );
        SearchOutcome {
            adjacency,
            score,
            iterations,
            trace,
        }
    }

    fn climb_node(&self, node: usize, start: FixedBitSet) -> ColumnClimb {
        let _span = tracing::debug_span!("node_search", node = node).entered();
        let mut cache: HashMap<FixedBitSet, f64> = HashMap::new();
        let mut best = self.climb_column(node, start.clone(), &mut cache);

        for restart in 1..=self.params.random_restarts {
            let perturbed = self.restart_column(node, &start, restart);
            let candidate = self.climb_column(node, perturbed, &mut cache);
            if candidate.score > best.score + IMPROVEMENT_EPSILON {
                best = ColumnClimb {
                    iterations: best.iterations + candidate.iterations,
                    ..candidate
                };
            } else {
                best.iterations += candidate.iterations;
            }
        }
        best
    }

    fn climb_column(
        &self,
        node: usize,
        mut parents: FixedBitSet,
        cache: &mut HashMap<FixedBitSet, f64>,
    ) -> ColumnClimb {
        let mut local = |bits: &FixedBitSet| {
            *cache.entry(bits.clone()).or_insert_with(|| {
                self.score
                    .local_score(node, bits)
                    .unwrap_or(f64::NEG_INFINITY)
            })
        };

        let mut current = local(&parents);
        let mut trace = Vec::new();
        while trace.len() < self.params.max_iterations {
            let mut best: Option<(Operation, FixedBitSet, f64)> = None;
            for from in self.constraints.allowed_parents(node).ones() {
                let mut toggled = parents.clone();
                toggled.toggle(from);
                if !self.constraints.check_feature_parents(node, &toggled).is_legal() {
                    continue;
                }
                let value = local(&toggled);
                if best.as_ref().map_or(true, |(_, _, b)| value > *b) {
                    let operation = if parents.contains(from) {
                        Operation::Delete { from, to: node }
                    } else {
                        Operation::Add { from, to: node }
                    };
                    best = Some((operation, toggled, value));
                }
            }
            match best {
                Some((operation, next, value)) if value - current > IMPROVEMENT_EPSILON => {
                    parents = next;
                    current = value;
                    trace.push(SearchStep {
                        iteration: trace.len() + 1,
                        operation,
                        score: current,
                    });
                }
                _ => break,
            }
        }

        ColumnClimb {
            node,
            parents,
            score: current,
            iterations: trace.len(),
            trace,
        }
    }

    /// Parent set `node` starts restart `restart` from: random legal toggles
    /// of its initial parents, drawn from `restart_seed(seed, restart, node)`.
    pub fn restart_column(&self, node: usize, initial: &FixedBitSet, restart: usize) -> FixedBitSet {
        let mut rng = StdRng::seed_from_u64(restart_seed(self.seed, restart, node));
        let allowed: Vec<usize> = self.constraints.allowed_parents(node).ones().collect();
        let mut perturbed = initial.clone();
        if allowed.is_empty() {
            return perturbed;
        }
        for _ in 0..self.params.restart_moves {
            let from = allowed[rng.random_range(0..allowed.len())];
            perturbed.toggle(from);
            if !self.constraints.check_feature_parents(node, &perturbed).is_legal() {
                perturbed.toggle(from);
            }
        }
        perturbed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rewards a fixed target edge set; each wrong or missing edge costs 1.
    struct TargetScore {
        target: AdjacencyMatrix,
        scope: Vec<usize>,
        decomposable: bool,
    }

    impl StructureScore for TargetScore {
        fn is_decomposable(&self) -> bool {
            self.decomposable
        }

        fn local_score(&self, node: usize, parents: &FixedBitSet) -> Option<f64> {
            if !self.decomposable {
                return None;
            }
            let mut diff = parents.clone();
            diff.symmetric_difference_with(self.target.parents(node));
            Some(-(diff.count_ones(..) as f64))
        }

        fn structure_score(&self, adjacency: &AdjacencyMatrix) -> f64 {
            self.scope
                .iter()
                .map(|&n| {
                    let mut diff = adjacency.parents(n).clone();
                    diff.symmetric_difference_with(self.target.parents(n));
                    -(diff.count_ones(..) as f64)
                })
                .sum()
        }

        fn scope(&self) -> &[usize] {
            &self.scope
        }
    }

    fn setup(decomposable: bool) -> (TargetScore, Constraints) {
        let kinds = vec![
            NodeKind::Class,
            NodeKind::Class,
            NodeKind::Feature,
            NodeKind::Feature,
        ];
        let mut target = AdjacencyMatrix::new(4);
        target.add_edge(0, 2);
        target.add_edge(1, 3);
        target.add_edge(3, 2);
        target.add_edge(2, 3);
        let score = TargetScore {
            target,
            scope: vec![2, 3],
            decomposable,
        };
        (score, Constraints::feature_model(kinds, None))
    }

    fn params() -> HillClimbingParams {
        HillClimbingParams {
            max_iterations: 100,
            random_restarts: 0,
            restart_moves: 0,
        }
    }

    #[test]
    fn test_global_reaches_target() {
        let (score, constraints) = setup(false);
        let outcome = HillClimbing::new(&score, &constraints, params()).run(&AdjacencyMatrix::new(4));
        assert_eq!(outcome.adjacency, score.target);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.iterations, 4);
    }

    #[test]
    fn test_per_node_reaches_target() {
        let (score, constraints) = setup(true);
        let outcome = HillClimbing::new(&score, &constraints, params()).run(&AdjacencyMatrix::new(4));
        assert_eq!(outcome.adjacency, score.target);
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn test_global_trace_is_monotone() {
        let (score, constraints) = setup(false);
        let outcome = HillClimbing::new(&score, &constraints, params()).run(&AdjacencyMatrix::new(4));
        let mut previous = score.structure_score(&AdjacencyMatrix::new(4));
        for step in &outcome.trace {
            assert!(step.score > previous);
            previous = step.score;
        }
    }

    #[test]
    fn test_iteration_cap() {
        let (score, constraints) = setup(false);
        let mut capped = params();
        capped.max_iterations = 2;
        let outcome = HillClimbing::new(&score, &constraints, capped).run(&AdjacencyMatrix::new(4));
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.adjacency.edge_count(), 2);
    }

    #[test]
    fn test_class_columns_untouched() {
        let (score, constraints) = setup(true);
        let mut initial = AdjacencyMatrix::new(4);
        initial.add_edge(0, 1);
        let outcome = HillClimbing::new(&score, &constraints, params()).run(&initial);
        assert!(outcome.adjacency.has_edge(0, 1));
    }

    #[test]
    fn test_restarts_are_deterministic() {
        let (score, constraints) = setup(false);
        let restarts = HillClimbingParams {
            max_iterations: 100,
            random_restarts: 3,
            restart_moves: 2,
        };
        let a = HillClimbing::new(&score, &constraints, restarts)
            .with_seed(11)
            .run(&AdjacencyMatrix::new(4));
        let b = HillClimbing::new(&score, &constraints, restarts)
            .with_seed(11)
            .run(&AdjacencyMatrix::new(4));
        assert_eq!(a.adjacency, b.adjacency);
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn test_restart_starts_do_not_depend_on_earlier_results() {
        let (decomposable, constraints) = setup(true);
        let (global, _) = setup(false);
        let restarts = HillClimbingParams {
            max_iterations: 100,
            random_restarts: 4,
            restart_moves: 3,
        };
        let mut initial = AdjacencyMatrix::new(4);
        initial.add_edge(0, 3);
        let a = HillClimbing::new(&decomposable, &constraints, restarts).with_seed(5);
        let b = HillClimbing::new(&global, &constraints, restarts).with_seed(5);

        // the search itself changes nothing about where a restart begins
        let before = a.restart_start(&initial, 3);
        a.run(&initial);
        b.run(&initial);
        for restart in 1..=restarts.random_restarts {
            let start = a.restart_start(&initial, restart);
            assert_eq!(start, b.restart_start(&initial, restart));
            assert!(constraints.check(&start).is_legal());

            let mut rng = StdRng::seed_from_u64(restart_seed(5, restart, 0));
            assert_eq!(start, perturb(&initial, &constraints, restarts.restart_moves, &mut rng));
        }
        assert_eq!(before, a.restart_start(&initial, 3));

        for node in [2, 3] {
            let column = a.restart_column(node, initial.parents(node), 2);
            assert_eq!(column, b.restart_column(node, initial.parents(node), 2));
            assert!(constraints.check_feature_parents(node, &column).is_legal());
        }
    }

    #[test]
    fn test_restarts_never_lose_the_first_climb() {
        let (score, constraints) = setup(false);
        let single = HillClimbing::new(&score, &constraints, params()).run(&AdjacencyMatrix::new(4));
        let restarted = HillClimbing::new(
            &score,
            &constraints,
            HillClimbingParams {
                max_iterations: 100,
                random_restarts: 5,
                restart_moves: 4,
            },
        )
        .with_seed(9)
        .run(&AdjacencyMatrix::new(4));
        assert!(restarted.score >= single.score);
    }

    #[test]
    fn test_feature_cap_respected() {
        let (score, _) = setup(true);
        let kinds = vec![
            NodeKind::Class,
            NodeKind::Class,
            NodeKind::Feature,
            NodeKind::Feature,
        ];
        let constraints = Constraints::feature_model(kinds, Some(0));
        let outcome = HillClimbing::new(&score, &constraints, params()).run(&AdjacencyMatrix::new(4));
        assert!(!outcome.adjacency.has_edge(3, 2));
        assert!(!outcome.adjacency.has_edge(2, 3));
        assert!(outcome.adjacency.has_edge(0, 2));
        assert!(outcome.adjacency.has_edge(1, 3));
    }
}
