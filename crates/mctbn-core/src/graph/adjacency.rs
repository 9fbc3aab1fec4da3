//! Adjacency matrix: the single source of truth for edges.
//!
//! Stored column-wise: `parents[j]` is the bit set of the parents of node
//! `j`, so "row i, column j" is `parents[j][i]`. Child lists are derived on
//! demand and can never disagree with parent lists.

use fixedbitset::FixedBitSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdjacencyMatrix {
    parents: Vec<FixedBitSet>,
}

impl AdjacencyMatrix {
    /// Edgeless graph over `n` nodes.
    pub fn new(n: usize) -> Self {
        AdjacencyMatrix {
            parents: vec![FixedBitSet::with_capacity(n); n],
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    #[inline]
    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.parents[to].contains(from)
    }

    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.parents[to].insert(from);
    }

    pub fn remove_edge(&mut self, from: usize, to: usize) {
        self.parents[to].set(from, false);
    }

    /// Replace `from -> to` with `to -> from`.
    pub fn reverse_edge(&mut self, from: usize, to: usize) {
        self.remove_edge(from, to);
        self.add_edge(to, from);
    }

    pub fn parents(&self, node: usize) -> &FixedBitSet {
        &self.parents[node]
    }

    pub fn parent_indices(&self, node: usize) -> Vec<usize> {
        self.parents[node].ones().collect()
    }

    pub fn children(&self, node: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&j| self.parents[j].contains(node))
            .collect()
    }

    /// Overwrite one column.
    pub fn set_parents(&mut self, node: usize, parents: FixedBitSet) {
        let mut parents = parents;
        parents.grow(self.len());
        self.parents[node] = parents;
    }

    /// All edges as `(from, to)`, ordered by target then source.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.parents
            .iter()
            .enumerate()
            .flat_map(|(to, bits)| bits.ones().map(move |from| (from, to)))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.parents.iter().map(|bits| bits.count_ones(..)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_and_children_consistent() {
        let mut adj = AdjacencyMatrix::new(4);
        adj.add_edge(0, 2);
        adj.add_edge(1, 2);
        adj.add_edge(0, 3);
        assert_eq!(adj.edge_count(), 3);
        assert_eq!(adj.children(0), vec![2, 3]);
        assert_eq!(adj.parent_indices(2), vec![0, 1]);
        for (from, to) in adj.edges() {
            assert!(adj.children(from).contains(&to));
        }
    }

    #[test]
    fn test_reverse_and_remove() {
        let mut adj = AdjacencyMatrix::new(3);
        adj.add_edge(0, 1);
        adj.reverse_edge(0, 1);
        assert!(!adj.has_edge(0, 1));
        assert!(adj.has_edge(1, 0));
        adj.remove_edge(1, 0);
        assert_eq!(adj.edge_count(), 0);
    }

    #[test]
    fn test_set_parents_grows_short_sets() {
        let mut adj = AdjacencyMatrix::new(5);
        let mut bits = FixedBitSet::with_capacity(2);
        bits.insert(1);
        adj.set_parents(4, bits);
        assert!(adj.has_edge(1, 4));
        assert_eq!(adj.parents(4).len(), 5);
    }
}
