//! Tabu search.
//!
//! Every step applies the best admissible move, improving or not. After a
//! move is accepted the expiry counter of every tabu entry drops by one, and
//! the inverse of the move enters the list for `tabu_list_size` steps. The
//! best structure seen is returned.

use super::{
    best_candidate, current_score, evaluate, neighbours, LocalCache, Operation, SearchOutcome,
    SearchStep, IMPROVEMENT_EPSILON,
};
use crate::graph::{AdjacencyMatrix, Constraints};
use crate::logging::{event_names, LogContext, Stage};
use crate::score::StructureScore;
use mctbn_config::TabuParams;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
struct TabuEntry {
    operation: Operation,
    remaining: usize,
}

/// Moves forbidden for a bounded number of accepted steps.
#[derive(Debug, Clone, Default)]
pub struct TabuList {
    entries: VecDeque<TabuEntry>,
}

impl TabuList {
    pub fn contains(&self, operation: &Operation) -> bool {
        self.entries.iter().any(|e| e.operation == *operation)
    }

    /// Age every entry by one step, then forbid `operation` for `tenure` steps.
    pub fn record(&mut self, operation: Operation, tenure: usize) {
        for entry in &mut self.entries {
            entry.remaining = entry.remaining.saturating_sub(1);
        }
        self.entries.retain(|e| e.remaining > 0);
        if tenure > 0 {
            self.entries.push_back(TabuEntry {
                operation,
                remaining: tenure,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct TabuSearch<'a> {
    score: &'a dyn StructureScore,
    constraints: &'a Constraints,
    params: TabuParams,
    context: LogContext,
}

impl<'a> TabuSearch<'a> {
    pub fn new(score: &'a dyn StructureScore, constraints: &'a Constraints, params: TabuParams) -> Self {
        TabuSearch {
            score,
            constraints,
            params,
            context: LogContext::fresh(),
        }
    }

    pub fn with_log_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    /// Stops after `max_iterations` moves, after `max_non_improving`
    /// consecutive moves without a new best, or when every move is tabu.
    pub fn run(&self, initial: &AdjacencyMatrix) -> SearchOutcome {
        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_STARTED,
            Stage::Search,
            "tabu search",
            tabu_list_size = self.params.tabu_list_size,
            max_iterations = self.params.max_iterations
        );

        let mut cache = LocalCache::new();
        let mut adjacency = initial.clone();
        let mut current = current_score(self.score, &adjacency, &mut cache);
        let mut best = (adjacency.clone(), current);
        let mut tabu = TabuList::default();
        let mut trace = Vec::new();
        let mut non_improving = 0;

        while trace.len() < self.params.max_iterations && non_improving < self.params.max_non_improving {
            let ops: Vec<Operation> = neighbours(&adjacency, self.constraints)
                .into_iter()
                .filter(|op| !tabu.contains(op))
                .collect();
            let mut candidates = evaluate(self.score, &adjacency, current, &ops, &cache);
            for candidate in &mut candidates {
                cache.extend(candidate.computed.drain(..));
            }
            let Some(chosen) = best_candidate(candidates) else {
                break;
            };
            if chosen.delta == f64::NEG_INFINITY {
                break;
            }

            chosen.operation.apply(&mut adjacency);
            current = if self.score.is_decomposable() {
                current_score(self.score, &adjacency, &mut cache)
            } else {
                current + chosen.delta
            };
            tabu.record(chosen.operation.inverse(), self.params.tabu_list_size);

            let step = SearchStep {
                iteration: trace.len() + 1,
                operation: chosen.operation,
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
                score = current,
                tabu = tabu.len()
            );
            trace.push(step);

            if current > best.1 + IMPROVEMENT_EPSILON {
                best = (adjacency.clone(), current);
                non_improving = 0;
            } else {
                non_improving += 1;
            }
        }

        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_CONVERGED,
            Stage::Search,
            "tabu search finished",
            score = best.1,
            iterations = trace.len(),
            edges = best.0.edge_count()
        );
        SearchOutcome {
            adjacency: best.0,
            score: best.1,
            iterations: trace.len(),
            trace,
        }
    }
}
