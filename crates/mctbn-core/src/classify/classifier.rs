//! Learning entry point and prediction.
//!
//! Learning runs in two stages inside a bounded worker pool:
//!
//! 1. the class sub-model: structure search over class columns only, then a
//!    conditional probability table per class node;
//! 2. the feature sub-model: structure search over feature columns, with the
//!    learned class network available to the conditional log-likelihood
//!    score, then a conditional intensity model per feature.
//!
//! The class columns are frozen before the feature search starts, and the
//! feature search never touches them.

use super::inference::{posterior, ClassSpace, Posterior};
use super::summary::{ModelSummary, SubModelSummary};
use crate::dataset::{BoundDataset, BoundSequence, Dataset, DomainBinding, VariableSpec};
use crate::estimate::{Cim, ParameterEstimator};
use crate::graph::{
    cardinalities, initial_structure, AdjacencyMatrix, Constraints, FittedNode, Legality, Node,
    NodeKind,
};
use crate::logging::{event_names, LogContext, Stage};
use crate::score::{ConditionalLogLikelihood, DecomposableScore, StructureScore};
use crate::search::constraint::ConstraintSearch;
use crate::search::hill_climbing::HillClimbing;
use crate::search::hybrid::HybridSearch;
use crate::search::tabu::TabuSearch;
use crate::search::SearchOutcome;
use chrono::Utc;
use mctbn_common::{Error, Result, State, SCHEMA_VERSION};
use mctbn_config::{validate_learn_config, LearnConfig, ScoreConfig, SearchConfig, SubModelConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Prediction for one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index of the sequence in the predicted dataset.
    pub sequence: usize,
    pub class_configuration: State,
    /// Posterior probability of `class_configuration`.
    pub probability: f64,
    /// Every class configuration with its posterior, when requested.
    pub posterior: Option<Vec<(State, f64)>>,
    /// No configuration explained the features; the prior decided.
    pub fallback: bool,
}

/// A learned multidimensional continuous-time Bayesian network classifier.
#[derive(Debug, Clone)]
pub struct Mctbnc {
    nodes: Vec<FittedNode>,
    adjacency: AdjacencyMatrix,
    space: ClassSpace,
    summary: ModelSummary,
}

/// Runs the search configured for one sub-model.
struct SubModelSearch<'a> {
    data: &'a BoundDataset,
    cardinalities: &'a [usize],
    kinds: &'a [NodeKind],
    seed: u64,
    context: &'a LogContext,
}

impl<'a> SubModelSearch<'a> {
    fn score<'b>(
        &'b self,
        config: &SubModelConfig,
        scope: Vec<usize>,
        space: Option<&'b ClassSpace>,
    ) -> Result<Box<dyn StructureScore + 'b>> {
        if let ScoreConfig::ConditionalLogLikelihood { penalization } = config.score {
            let space = space.ok_or_else(|| {
                Error::Config("conditional_log_likelihood scores feature structures only".to_string())
            })?;
            return Ok(Box::new(ConditionalLogLikelihood::new(
                self.data,
                self.cardinalities.to_vec(),
                scope,
                space,
                ParameterEstimator::from_config(&config.estimator),
                penalization,
            )));
        }
        let score = DecomposableScore::from_config(
            self.data,
            self.cardinalities.to_vec(),
            self.kinds.to_vec(),
            scope,
            &config.score,
            &config.estimator,
        )
        .ok_or_else(|| Error::Config(format!("{} is not decomposable", config.score.as_str())))?;
        Ok(Box::new(score))
    }

    fn run(
        &self,
        config: &SubModelConfig,
        constraints: &Constraints,
        scope: Vec<usize>,
        initial: &AdjacencyMatrix,
        space: Option<&ClassSpace>,
    ) -> Result<SearchOutcome> {
        let score = if config.search.uses_score() {
            Some(self.score(config, scope, space)?)
        } else {
            None
        };
        let context = self.context.clone();

        let outcome = match (config.search, score.as_deref()) {
            (SearchConfig::ConstraintBased(params), _) => {
                ConstraintSearch::new(self.data, self.cardinalities.to_vec(), constraints, params)
                    .with_log_context(context)
                    .run(initial)
            }
            (SearchConfig::HillClimbing(params), Some(score)) => {
                HillClimbing::new(score, constraints, params)
                    .with_seed(self.seed)
                    .with_log_context(context)
                    .run(initial)
            }
            (SearchConfig::Tabu(params), Some(score)) => TabuSearch::new(score, constraints, params)
                .with_log_context(context)
                .run(initial),
            (SearchConfig::Hybrid(params), Some(score)) => HybridSearch::new(
                self.data,
                self.cardinalities.to_vec(),
                score,
                constraints,
                params,
            )
            .with_seed(self.seed)
            .with_log_context(context)
            .run(initial),
            (search, None) => {
                return Err(Error::Config(format!("{} search needs a score", search.as_str())));
            }
        };

        if let Legality::Illegal(reason) = constraints.check(&outcome.adjacency) {
            return Err(Error::IllegalStructure(format!("{reason:?}")));
        }
        Ok(outcome)
    }
}

fn build_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("mctbn-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("failed to build worker pool: {e}")))
}

fn edges_into(adjacency: &AdjacencyMatrix, nodes: &[usize]) -> usize {
    nodes.iter().map(|&n| adjacency.parents(n).count_ones(..)).sum()
}

impl Mctbnc {
    /// Learn a classifier with a fresh run id.
    pub fn learn(dataset: &Dataset, config: &LearnConfig) -> Result<Self> {
        Self::learn_with_context(dataset, config, LogContext::fresh())
    }

    /// Learn a classifier, logging under `context`.
    ///
    /// Configuration errors are reported before any statistic is computed.
    pub fn learn_with_context(dataset: &Dataset, config: &LearnConfig, context: LogContext) -> Result<Self> {
        let span = tracing::info_span!("learn", run_id = %context.run_id);
        let _entered = span.enter();

        if let Err(err) = validate_learn_config(config) {
            crate::log_event!(
                context,
                WARN,
                event_names::CONFIG_REJECTED,
                Stage::Init,
                "configuration rejected",
                code = err.code(),
                detail = err.to_string().as_str()
            );
            return Err(err.into());
        }
        if dataset.class_variables().is_empty() {
            return Err(Error::Data("at least one class variable is required".to_string()));
        }
        if dataset.feature_variables().is_empty() {
            return Err(Error::Data("at least one feature variable is required".to_string()));
        }
        if dataset.num_sequences() == 0 {
            return Err(Error::EmptyDataset);
        }

        let pool = build_pool(config.threads)?;
        pool.install(|| Self::fit(dataset, config, &context))
    }

    fn fit(dataset: &Dataset, config: &LearnConfig, context: &LogContext) -> Result<Self> {
        let started = std::time::Instant::now();
        let nodes = Node::from_variables(dataset.variables());
        let cards = cardinalities(&nodes);
        let kinds: Vec<NodeKind> = nodes.iter().map(|n| n.kind).collect();
        let specs: Vec<VariableSpec> = nodes.iter().map(Node::spec).collect();
        let data = BoundDataset::new(dataset, &specs)?.with_log_context(context.clone());

        let class_count = dataset.class_variables().len();
        let classes: Vec<usize> = (0..class_count).collect();
        let features: Vec<usize> = (class_count..nodes.len()).collect();

        crate::log_event!(
            context,
            INFO,
            event_names::LEARN_STARTED,
            Stage::Init,
            "learning started",
            sequences = data.num_sequences(),
            class_variables = classes.len(),
            feature_variables = features.len(),
            class_search = config.class_model.search.as_str(),
            feature_search = config.feature_model.search.as_str(),
            feature_score = config.feature_model.score.as_str(),
            threads = rayon::current_num_threads()
        );

        let search = SubModelSearch {
            data: &data,
            cardinalities: &cards,
            kinds: &kinds,
            seed: config.seed,
            context,
        };
        let initial = initial_structure(&nodes, config.initial_structure);

        let class_constraints = Constraints::class_model(kinds.clone());
        let class_outcome = search.run(&config.class_model, &class_constraints, classes.clone(), &initial, None)?;
        let class_nodes = ParameterEstimator::from_config(&config.class_model.estimator).fit_all(
            &nodes[..class_count],
            &cards,
            &class_outcome.adjacency,
            &data,
        );
        let space = ClassSpace::new(&class_nodes);

        let feature_constraints = Constraints::feature_model(kinds.clone(), config.max_feature_parents);
        let feature_outcome = search.run(
            &config.feature_model,
            &feature_constraints,
            features.clone(),
            &class_outcome.adjacency,
            Some(&space),
        )?;
        let adjacency = feature_outcome.adjacency.clone();

        let mut fitted = class_nodes;
        fitted.extend(
            ParameterEstimator::from_config(&config.feature_model.estimator).fit_all(
                &nodes[class_count..],
                &cards,
                &adjacency,
                &data,
            ),
        );

        let (node_summaries, edges) = ModelSummary::describe_nodes(&fitted, &adjacency);
        let summary = ModelSummary {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id: context.run_id.clone(),
            learned_at: Utc::now(),
            sequences: data.num_sequences(),
            nodes: node_summaries,
            edges,
            class_model: SubModelSummary::new(
                &config.class_model,
                &class_outcome,
                edges_into(&adjacency, &classes),
            ),
            feature_model: SubModelSummary::new(
                &config.feature_model,
                &feature_outcome,
                edges_into(&adjacency, &features),
            ),
        };

        crate::log_event!(
            context,
            INFO,
            event_names::LEARN_FINISHED,
            Stage::Estimate,
            "learning finished",
            edges = adjacency.edge_count(),
            bridge_edges = summary.bridge_edges().count(),
            class_configurations = space.len(),
            elapsed_ms = started.elapsed().as_millis() as u64
        );

        Ok(Mctbnc {
            nodes: fitted,
            adjacency,
            space,
            summary,
        })
    }

    pub fn nodes(&self) -> &[FittedNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&FittedNode> {
        self.nodes.iter().find(|f| f.node.name == name)
    }

    pub fn adjacency(&self) -> &AdjacencyMatrix {
        &self.adjacency
    }

    pub fn class_space(&self) -> &ClassSpace {
        &self.space
    }

    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }

    pub fn run_id(&self) -> &str {
        &self.summary.run_id
    }

    /// Whether `parent` is a parent of `child`, by variable name.
    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        match (self.node(parent), self.node(child)) {
            (Some(p), Some(c)) => self.adjacency.has_edge(p.node.index, c.node.index),
            _ => false,
        }
    }

    fn feature_models(&self) -> Vec<(usize, &Cim)> {
        self.nodes
            .iter()
            .filter_map(|f| f.model.cim().map(|cim| (f.node.index, cim)))
            .collect()
    }

    /// Posterior over class configurations for one sequence in node space.
    pub fn posterior(&self, sequence: &BoundSequence) -> Posterior {
        posterior(&self.space, &self.feature_models(), sequence)
    }

    /// Predict the class configuration of every sequence of `dataset`.
    ///
    /// Class columns may be absent. Values outside the training domains make
    /// the affected configurations impossible; when none remains the prior
    /// decides and the prediction is flagged.
    pub fn predict(&self, dataset: &Dataset, with_posterior: bool) -> Result<Vec<Prediction>> {
        self.predict_with_context(dataset, with_posterior, &LogContext::new(self.summary.run_id.clone()))
    }

    /// [`Mctbnc::predict`], counting fallbacks and unseen values under `context`.
    pub fn predict_with_context(
        &self,
        dataset: &Dataset,
        with_posterior: bool,
        context: &LogContext,
    ) -> Result<Vec<Prediction>> {
        let specs: Vec<VariableSpec> = self.nodes.iter().map(|f| f.node.spec()).collect();
        let binding = DomainBinding::lenient(dataset, &specs);
        if let Some(missing) = self
            .nodes
            .iter()
            .find(|f| !f.node.is_class() && !binding.is_bound(f.node.index))
        {
            return Err(Error::MissingVariable {
                name: missing.node.name.clone(),
            });
        }
        let data = binding.bind(dataset).with_log_context(context.clone());
        let features = self.feature_models();

        let predictions: Vec<Prediction> = data
            .sequences()
            .par_iter()
            .enumerate()
            .map(|(i, sequence)| self.predict_sequence(context, i, sequence, &features, with_posterior))
            .collect::<Result<_>>()?;

        crate::log_event!(
            context,
            INFO,
            event_names::CLASSIFY_FINISHED,
            Stage::Classify,
            "prediction finished",
            sequences = predictions.len(),
            fallbacks = predictions.iter().filter(|p| p.fallback).count()
        );
        Ok(predictions)
    }

    fn predict_sequence(
        &self,
        context: &LogContext,
        index: usize,
        sequence: &BoundSequence,
        features: &[(usize, &Cim)],
        with_posterior: bool,
    ) -> Result<Prediction> {
        let post = posterior(&self.space, features, sequence);
        if post.is_fallback() {
            if let Some(occurrences) = context.warnings.prior_fallback.hit() {
                crate::log_event!(
                    context,
                    WARN,
                    event_names::CLASSIFY_FALLBACK,
                    Stage::Classify,
                    "no class configuration explains the sequence; using the prior",
                    sequence = index as u64,
                    occurrences = occurrences
                );
            }
        }
        let (best, probability) = post
            .argmax()
            .ok_or_else(|| Error::Inference("class space is empty".to_string()))?;

        let posterior = with_posterior.then(|| {
            post.probabilities()
                .iter()
                .enumerate()
                .map(|(c, &p)| (self.space.state(c), p))
                .collect()
        });
        Ok(Prediction {
            sequence: index,
            class_configuration: self.space.state(best),
            probability,
            posterior,
            fallback: post.is_fallback(),
        })
    }
}
