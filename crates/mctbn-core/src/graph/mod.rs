//! Node graph: an arena of nodes addressed by index plus one adjacency
//! matrix holding every edge.

mod adjacency;
pub mod legality;
mod node;

pub use adjacency::AdjacencyMatrix;
pub use legality::{Constraints, IllegalReason, Legality};
pub use node::{FittedNode, Node, NodeKind, NodeModel, ParentConfig};

use mctbn_config::InitialStructure;

/// Seed structure for the search.
pub fn initial_structure(nodes: &[Node], initial: InitialStructure) -> AdjacencyMatrix {
    let mut adjacency = AdjacencyMatrix::new(nodes.len());
    if initial == InitialStructure::NaiveBayes {
        for class in nodes.iter().filter(|n| n.is_class()) {
            for feature in nodes.iter().filter(|n| !n.is_class()) {
                adjacency.add_edge(class.index, feature.index);
            }
        }
    }
    adjacency
}

/// Cardinality of every node, by index.
pub fn cardinalities(nodes: &[Node]) -> Vec<usize> {
    nodes.iter().map(Node::cardinality).collect()
}
