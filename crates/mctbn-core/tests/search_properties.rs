//! Property-based tests for structure legality and search invariants.

use mctbn_config::{HillClimbingParams, Penalization, TabuParams};
use mctbn_core::dataset::BoundDataset;
use mctbn_core::estimate::ParameterEstimator;
use mctbn_core::graph::{cardinalities, AdjacencyMatrix, Constraints, Node, NodeKind};
use mctbn_core::score::{DecomposableScore, LocalScoreKind, StructureScore};
use mctbn_core::search::hill_climbing::HillClimbing;
use mctbn_core::search::tabu::TabuSearch;
use mctbn_core::search::{neighbours, perturb, Operation};
use mctbn_core::{Dataset, DatasetBuilder};
use proptest::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

fn kinds(classes: usize, features: usize) -> Vec<NodeKind> {
    let mut kinds = vec![NodeKind::Class; classes];
    kinds.extend(std::iter::repeat(NodeKind::Feature).take(features));
    kinds
}

/// Kahn's algorithm over the class-to-class edges.
fn class_graph_is_acyclic(adjacency: &AdjacencyMatrix, kinds: &[NodeKind]) -> bool {
    let classes: Vec<usize> = (0..kinds.len()).filter(|&i| kinds[i] == NodeKind::Class).collect();
    let mut indegree: Vec<usize> = classes
        .iter()
        .map(|&to| classes.iter().filter(|&&from| adjacency.has_edge(from, to)).count())
        .collect();
    let mut ready: Vec<usize> = (0..classes.len()).filter(|&i| indegree[i] == 0).collect();
    let mut visited = 0;
    while let Some(i) = ready.pop() {
        visited += 1;
        for (j, &to) in classes.iter().enumerate() {
            if adjacency.has_edge(classes[i], to) {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push(j);
                }
            }
        }
    }
    visited == classes.len()
}

fn matrix_strategy() -> impl Strategy<Value = (usize, usize, Vec<bool>)> {
    (1usize..=3, 1usize..=3).prop_flat_map(|(c, f)| {
        let n = c + f;
        (Just(c), Just(f), prop::collection::vec(any::<bool>(), n * n))
    })
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn random_dataset(seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = DatasetBuilder::new(strings(&["t", "A", "B", "F", "G"]), "t", &["A", "B"]).unwrap();
    for _ in 0..8 {
        let a = ["x", "y"][rng.random_range(0..2)];
        let bv = if rng.random_bool(0.8) { a } else { "z" };
        let mut t = 0.0;
        let rows = (0..30)
            .map(|_| {
                let f = ["0", "1", "2"][rng.random_range(0..3)];
                let g = if rng.random_bool(0.7) { f } else { "9" };
                let row = strings(&[&format!("{t}"), a, bv, f, g]);
                t += rng.random_range(0.1..1.5);
                row
            })
            .collect();
        b.add_sequence(rows).unwrap();
    }
    b.build().unwrap()
}

fn bind(dataset: &Dataset) -> (Vec<Node>, BoundDataset) {
    let nodes = Node::from_variables(dataset.variables());
    let specs: Vec<_> = nodes.iter().map(Node::spec).collect();
    let data = BoundDataset::new(dataset, &specs).unwrap();
    (nodes, data)
}

fn score<'a>(nodes: &[Node], data: &'a BoundDataset) -> DecomposableScore<'a> {
    DecomposableScore::new(
        data,
        cardinalities(nodes),
        nodes.iter().map(|n| n.kind).collect(),
        (0..nodes.len()).collect(),
        LocalScoreKind::LogLikelihood(ParameterEstimator::bayesian(1.0, 1.0, 1.0)),
        Penalization::Bic,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn accepted_structures_have_acyclic_classes_and_no_feature_to_class_edges(
        (c, f, bits) in matrix_strategy()
    ) {
        let n = c + f;
        let kinds = kinds(c, f);
        let mut adjacency = AdjacencyMatrix::new(n);
        for from in 0..n {
            for to in 0..n {
                if from != to && bits[from * n + to] {
                    adjacency.add_edge(from, to);
                }
            }
        }
        let constraints = Constraints::new(kinds.clone(), None);
        if constraints.check(&adjacency).is_legal() {
            for (from, to) in adjacency.edges() {
                prop_assert!(!(kinds[from] == NodeKind::Feature && kinds[to] == NodeKind::Class));
            }
            prop_assert!(class_graph_is_acyclic(&adjacency, &kinds));
        }
    }

    #[test]
    fn legal_moves_keep_structures_legal(
        c in 1usize..=3,
        f in 1usize..=3,
        cap in prop::option::of(0usize..=2),
        seed in any::<u64>(),
        moves in 1usize..40,
    ) {
        let constraints = Constraints::new(kinds(c, f), cap);
        let mut rng = StdRng::seed_from_u64(seed);
        let adjacency = perturb(&AdjacencyMatrix::new(c + f), &constraints, moves, &mut rng);
        prop_assert!(constraints.check(&adjacency).is_legal());
        for op in neighbours(&adjacency, &constraints) {
            let mut next = adjacency.clone();
            op.apply(&mut next);
            prop_assert!(constraints.check(&next).is_legal(), "{} broke legality", op);
        }
    }
}

#[test]
fn hill_climbing_never_decreases_the_score() {
    for seed in [3, 5, 8] {
        let dataset = random_dataset(seed);
        let (nodes, data) = bind(&dataset);
        let score = score(&nodes, &data);
        let constraints = Constraints::new(nodes.iter().map(|n| n.kind).collect(), None);
        let initial = AdjacencyMatrix::new(nodes.len());
        let outcome = HillClimbing::new(&score, &constraints, HillClimbingParams::default())
            .run_global(&initial);

        let mut previous = score.structure_score(&initial);
        for step in &outcome.trace {
            assert!(step.score > previous, "seed {seed}: {} after {}", step.score, previous);
            previous = step.score;
        }
        assert!(constraints.check(&outcome.adjacency).is_legal());
        assert!((score.structure_score(&outcome.adjacency) - outcome.score).abs() < 1e-6);
    }
}

#[test]
fn tabu_never_applies_a_listed_inverse() {
    let dataset = random_dataset(13);
    let (nodes, data) = bind(&dataset);
    let score = score(&nodes, &data);
    let constraints = Constraints::new(nodes.iter().map(|n| n.kind).collect(), None);
    let params = TabuParams {
        tabu_list_size: 4,
        max_iterations: 60,
        max_non_improving: 60,
    };
    let outcome = TabuSearch::new(&score, &constraints, params).run(&AdjacencyMatrix::new(nodes.len()));

    let operations: Vec<Operation> = outcome.trace.iter().map(|s| s.operation).collect();
    for (i, op) in operations.iter().enumerate() {
        let window = &operations[i + 1..operations.len().min(i + 1 + params.tabu_list_size)];
        assert!(
            !window.contains(&op.inverse()),
            "inverse of {} applied within {} moves",
            op,
            params.tabu_list_size
        );
    }
    assert!(constraints.check(&outcome.adjacency).is_legal());
}
