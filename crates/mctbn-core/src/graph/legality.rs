//! Legality of candidate structures.
//!
//! A structure is legal when the class sub-graph is acyclic, no class node
//! has a feature parent, no node is its own parent, and no feature exceeds
//! the cap on feature parents. The feature sub-graph may contain cycles.
//!
//! Search additionally restricts which edges it may touch through an
//! allowed-parents mask: the class search only edits class columns, the
//! feature search only feature columns, and a hybrid search only edges kept
//! by its restriction phase.

use super::{AdjacencyMatrix, NodeKind};
use crate::search::Operation;
use fixedbitset::FixedBitSet;
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

/// Why a structure or move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IllegalReason {
    SelfLoop { node: usize },
    FeatureToClass { from: usize, to: usize },
    ClassCycle,
    TooManyFeatureParents { node: usize, count: usize, max: usize },
    OutsideAllowed { from: usize, to: usize },
    MissingEdge { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    Legal,
    Illegal(IllegalReason),
}

impl Legality {
    pub fn is_legal(&self) -> bool {
        matches!(self, Legality::Legal)
    }
}

/// Structural rules plus the edit mask of one search.
#[derive(Debug, Clone)]
pub struct Constraints {
    kinds: Vec<NodeKind>,
    max_feature_parents: Option<usize>,
    /// `allowed[to]`: parents `to` may gain or lose.
    allowed: Vec<FixedBitSet>,
}

impl Constraints {
    /// Every structurally possible edge is editable.
    pub fn new(kinds: Vec<NodeKind>, max_feature_parents: Option<usize>) -> Self {
        let n = kinds.len();
        let allowed = (0..n)
            .map(|to| {
                let mut bits = FixedBitSet::with_capacity(n);
                for from in 0..n {
                    let bridge_ok = !(kinds[from] == NodeKind::Feature && kinds[to] == NodeKind::Class);
                    if from != to && bridge_ok {
                        bits.insert(from);
                    }
                }
                bits
            })
            .collect();
        Constraints {
            kinds,
            max_feature_parents,
            allowed,
        }
    }

    /// Only class-to-class edges are editable.
    pub fn class_model(kinds: Vec<NodeKind>) -> Self {
        let mut constraints = Self::new(kinds, None);
        for to in 0..constraints.kinds.len() {
            if constraints.kinds[to] == NodeKind::Feature {
                constraints.allowed[to].clear();
            }
        }
        constraints
    }

    /// Only edges into features are editable.
    pub fn feature_model(kinds: Vec<NodeKind>, max_feature_parents: Option<usize>) -> Self {
        let mut constraints = Self::new(kinds, max_feature_parents);
        for to in 0..constraints.kinds.len() {
            if constraints.kinds[to] == NodeKind::Class {
                constraints.allowed[to].clear();
            }
        }
        constraints
    }

    /// Intersect the edit mask with `mask` (indexed like the allowed sets).
    pub fn restrict(mut self, mask: &[FixedBitSet]) -> Self {
        for (allowed, keep) in self.allowed.iter_mut().zip(mask) {
            allowed.intersect_with(keep);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kind(&self, node: usize) -> NodeKind {
        self.kinds[node]
    }

    pub fn kinds(&self) -> &[NodeKind] {
        &self.kinds
    }

    pub fn max_feature_parents(&self) -> Option<usize> {
        self.max_feature_parents
    }

    pub fn allowed_parents(&self, node: usize) -> &FixedBitSet {
        &self.allowed[node]
    }

    pub fn is_allowed(&self, from: usize, to: usize) -> bool {
        self.allowed[to].contains(from)
    }

    /// Nodes whose parent set this search may edit.
    pub fn editable_nodes(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&n| self.allowed[n].count_ones(..) > 0)
            .collect()
    }

    fn feature_parent_count(&self, parents: &FixedBitSet) -> usize {
        parents
            .ones()
            .filter(|&p| self.kinds[p] == NodeKind::Feature)
            .count()
    }

    /// Structural check of a whole matrix; the edit mask is not consulted.
    pub fn check(&self, adjacency: &AdjacencyMatrix) -> Legality {
        for to in 0..adjacency.len() {
            let parents = adjacency.parents(to);
            if parents.contains(to) {
                return Legality::Illegal(IllegalReason::SelfLoop { node: to });
            }
            if self.kinds[to] == NodeKind::Class {
                if let Some(from) = parents.ones().find(|&p| self.kinds[p] == NodeKind::Feature) {
                    return Legality::Illegal(IllegalReason::FeatureToClass { from, to });
                }
            } else if let Some(max) = self.max_feature_parents {
                let count = self.feature_parent_count(parents);
                if count > max {
                    return Legality::Illegal(IllegalReason::TooManyFeatureParents {
                        node: to,
                        count,
                        max,
                    });
                }
            }
        }
        if is_cyclic_directed(&self.class_graph(adjacency)) {
            return Legality::Illegal(IllegalReason::ClassCycle);
        }
        Legality::Legal
    }

    /// Check a feature node's candidate parent set in isolation.
    ///
    /// Feature columns never create class cycles, so this is exact for
    /// feature nodes and lets per-node search skip the whole-graph check.
    pub fn check_feature_parents(&self, node: usize, parents: &FixedBitSet) -> Legality {
        if parents.contains(node) {
            return Legality::Illegal(IllegalReason::SelfLoop { node });
        }
        if let Some(max) = self.max_feature_parents {
            let count = self.feature_parent_count(parents);
            if count > max {
                return Legality::Illegal(IllegalReason::TooManyFeatureParents { node, count, max });
            }
        }
        Legality::Legal
    }

    /// Whether applying `op` to a legal `adjacency` keeps it legal and stays
    /// inside the edit mask.
    pub fn check_operation(&self, adjacency: &AdjacencyMatrix, op: Operation) -> Legality {
        match op {
            Operation::Add { from, to } => {
                if adjacency.has_edge(from, to) {
                    return Legality::Illegal(IllegalReason::OutsideAllowed { from, to });
                }
                self.check_addition(adjacency, from, to)
            }
            Operation::Delete { from, to } => {
                if !adjacency.has_edge(from, to) {
                    return Legality::Illegal(IllegalReason::MissingEdge { from, to });
                }
                if !self.is_allowed(from, to) {
                    return Legality::Illegal(IllegalReason::OutsideAllowed { from, to });
                }
                Legality::Legal
            }
            Operation::Reverse { from, to } => {
                if !adjacency.has_edge(from, to) {
                    return Legality::Illegal(IllegalReason::MissingEdge { from, to });
                }
                if !self.is_allowed(from, to) {
                    return Legality::Illegal(IllegalReason::OutsideAllowed { from, to });
                }
                let mut without = adjacency.clone();
                without.remove_edge(from, to);
                self.check_addition(&without, to, from)
            }
        }
    }

    fn check_addition(&self, adjacency: &AdjacencyMatrix, from: usize, to: usize) -> Legality {
        if from == to {
            return Legality::Illegal(IllegalReason::SelfLoop { node: to });
        }
        if self.kinds[from] == NodeKind::Feature && self.kinds[to] == NodeKind::Class {
            return Legality::Illegal(IllegalReason::FeatureToClass { from, to });
        }
        if !self.is_allowed(from, to) {
            return Legality::Illegal(IllegalReason::OutsideAllowed { from, to });
        }
        match (self.kinds[from], self.kinds[to]) {
            (NodeKind::Feature, NodeKind::Feature) => {
                if let Some(max) = self.max_feature_parents {
                    let count = self.feature_parent_count(adjacency.parents(to)) + 1;
                    if count > max {
                        return Legality::Illegal(IllegalReason::TooManyFeatureParents {
                            node: to,
                            count,
                            max,
                        });
                    }
                }
                Legality::Legal
            }
            (NodeKind::Class, NodeKind::Class) => {
                let graph = self.class_graph(adjacency);
                if has_path_connecting(&graph, NodeIndex::new(to), NodeIndex::new(from), None) {
                    Legality::Illegal(IllegalReason::ClassCycle)
                } else {
                    Legality::Legal
                }
            }
            _ => Legality::Legal,
        }
    }

    /// Directed graph over all node indices holding only class-to-class edges.
    fn class_graph(&self, adjacency: &AdjacencyMatrix) -> DiGraph<(), ()> {
        let mut graph = DiGraph::with_capacity(adjacency.len(), 0);
        for _ in 0..adjacency.len() {
            graph.add_node(());
        }
        for (from, to) in adjacency.edges() {
            if self.kinds[from] == NodeKind::Class && self.kinds[to] == NodeKind::Class {
                graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds() -> Vec<NodeKind> {
        vec![
            NodeKind::Class,
            NodeKind::Class,
            NodeKind::Feature,
            NodeKind::Feature,
        ]
    }

    #[test]
    fn test_feature_to_class_illegal() {
        let constraints = Constraints::new(kinds(), None);
        let mut adj = AdjacencyMatrix::new(4);
        adj.add_edge(2, 0);
        assert_eq!(
            constraints.check(&adj),
            Legality::Illegal(IllegalReason::FeatureToClass { from: 2, to: 0 })
        );
        let op = Operation::Add { from: 3, to: 1 };
        assert!(!constraints
            .check_operation(&AdjacencyMatrix::new(4), op)
            .is_legal());
    }

    #[test]
    fn test_class_cycle_detected() {
        let constraints = Constraints::new(kinds(), None);
        let mut adj = AdjacencyMatrix::new(4);
        adj.add_edge(0, 1);
        let op = Operation::Add { from: 1, to: 0 };
        assert_eq!(
            constraints.check_operation(&adj, op),
            Legality::Illegal(IllegalReason::ClassCycle)
        );
        adj.add_edge(1, 0);
        assert_eq!(
            constraints.check(&adj),
            Legality::Illegal(IllegalReason::ClassCycle)
        );
    }

    #[test]
    fn test_feature_cycles_allowed() {
        let constraints = Constraints::new(kinds(), None);
        let mut adj = AdjacencyMatrix::new(4);
        adj.add_edge(2, 3);
        assert!(constraints
            .check_operation(&adj, Operation::Add { from: 3, to: 2 })
            .is_legal());
        adj.add_edge(3, 2);
        assert!(constraints.check(&adj).is_legal());
    }

    #[test]
    fn test_max_feature_parents_ignores_class_parents() {
        let constraints = Constraints::new(kinds(), Some(0));
        let mut adj = AdjacencyMatrix::new(4);
        adj.add_edge(0, 2);
        adj.add_edge(1, 2);
        assert!(constraints.check(&adj).is_legal());
        assert!(!constraints
            .check_operation(&adj, Operation::Add { from: 3, to: 2 })
            .is_legal());
    }

    #[test]
    fn test_reverse_bridge_is_illegal() {
        let constraints = Constraints::new(kinds(), None);
        let mut adj = AdjacencyMatrix::new(4);
        adj.add_edge(0, 2);
        assert_eq!(
            constraints.check_operation(&adj, Operation::Reverse { from: 0, to: 2 }),
            Legality::Illegal(IllegalReason::FeatureToClass { from: 2, to: 0 })
        );
    }

    #[test]
    fn test_sub_model_masks() {
        let class = Constraints::class_model(kinds());
        assert_eq!(class.editable_nodes(), vec![0, 1]);
        assert!(!class.is_allowed(0, 2));

        let feature = Constraints::feature_model(kinds(), None);
        assert_eq!(feature.editable_nodes(), vec![2, 3]);
        assert!(feature.is_allowed(0, 2));
        assert!(!feature.is_allowed(0, 1));
    }

    #[test]
    fn test_restrict_mask() {
        let mut mask = vec![FixedBitSet::with_capacity(4); 4];
        mask[2].insert(0);
        let constraints = Constraints::feature_model(kinds(), None).restrict(&mask);
        assert!(constraints.is_allowed(0, 2));
        assert!(!constraints.is_allowed(1, 2));
        assert!(!constraints.is_allowed(2, 3));
    }

    #[test]
    fn test_self_loop() {
        let constraints = Constraints::new(kinds(), None);
        let mut bits = FixedBitSet::with_capacity(4);
        bits.insert(2);
        assert_eq!(
            constraints.check_feature_parents(2, &bits),
            Legality::Illegal(IllegalReason::SelfLoop { node: 2 })
        );
    }
}
