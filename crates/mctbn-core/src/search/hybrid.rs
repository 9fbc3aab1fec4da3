//! Restrict, then maximize.
//!
//! The constraint-based phase prunes the candidate parents of every editable
//! node; hill climbing then only touches edges that survived.

use super::constraint::ConstraintSearch;
use super::hill_climbing::HillClimbing;
use super::SearchOutcome;
use crate::dataset::BoundDataset;
use crate::graph::{AdjacencyMatrix, Constraints};
use crate::logging::{event_names, LogContext, Stage};
use crate::score::StructureScore;
use mctbn_config::HybridParams;

pub struct HybridSearch<'a> {
    data: &'a BoundDataset,
    cardinalities: Vec<usize>,
    score: &'a dyn StructureScore,
    constraints: &'a Constraints,
    params: HybridParams,
    seed: u64,
    context: LogContext,
}

impl<'a> HybridSearch<'a> {
    pub fn new(
        data: &'a BoundDataset,
        cardinalities: Vec<usize>,
        score: &'a dyn StructureScore,
        constraints: &'a Constraints,
        params: HybridParams,
    ) -> Self {
        HybridSearch {
            data,
            cardinalities,
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

    pub fn run(&self, initial: &AdjacencyMatrix) -> SearchOutcome {
        let mask = ConstraintSearch::new(
            self.data,
            self.cardinalities.clone(),
            self.constraints,
            self.params.constraint,
        )
        .with_log_context(self.context.clone())
        .mask();

        let restricted = self.constraints.clone().restrict(&mask);
        let mut start = initial.clone();
        for node in self.constraints.editable_nodes() {
            let mut kept = initial.parents(node).clone();
            kept.intersect_with(restricted.allowed_parents(node));
            start.set_parents(node, kept);
        }

        crate::log_event!(
            self.context,
            INFO,
            event_names::SEARCH_STARTED,
            Stage::Search,
            "hybrid maximization phase",
            candidate_edges = mask.iter().map(|m| m.count_ones(..)).sum::<usize>()
        );

        HillClimbing::new(self.score, &restricted, self.params.hill_climbing)
            .with_seed(self.seed)
            .with_log_context(self.context.clone())
            .run(&start)
    }
}
