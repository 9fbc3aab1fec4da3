//! Nodes and parent configurations.

use crate::dataset::{Variable, VariableSpec};
use crate::estimate::{Cim, Cpt};
use crate::stats::{BnStatistics, CtbnStatistics};
use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};

pub use crate::dataset::VariableKind as NodeKind;

/// A discrete random variable at a stable index.
///
/// Class nodes occupy indices `0..class_count`, features follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub index: usize,
    pub name: String,
    pub domain: Vec<String>,
    pub kind: NodeKind,
}

impl Node {
    /// One node per dataset variable, in dataset order.
    pub fn from_variables(variables: &[Variable]) -> Vec<Node> {
        variables
            .iter()
            .enumerate()
            .map(|(index, v)| Node {
                index,
                name: v.name.clone(),
                domain: v.domain.clone(),
                kind: v.kind,
            })
            .collect()
    }

    pub fn cardinality(&self) -> usize {
        self.domain.len()
    }

    pub fn is_class(&self) -> bool {
        self.kind == NodeKind::Class
    }

    pub fn spec(&self) -> VariableSpec<'_> {
        VariableSpec {
            name: &self.name,
            domain: &self.domain,
        }
    }
}

/// Parents of one node with their cardinalities.
///
/// The joint parent-state index is mixed-radix with the first parent
/// (lowest node index) least significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentConfig {
    parents: Vec<usize>,
    radices: Vec<usize>,
}

impl ParentConfig {
    /// `parents` must be ascending; `cardinalities` is indexed by node.
    pub fn new(parents: Vec<usize>, cardinalities: &[usize]) -> Self {
        let radices = parents.iter().map(|&p| cardinalities[p]).collect();
        ParentConfig { parents, radices }
    }

    pub fn from_bits(parents: &FixedBitSet, cardinalities: &[usize]) -> Self {
        Self::new(parents.ones().collect(), cardinalities)
    }

    pub fn empty() -> Self {
        ParentConfig {
            parents: Vec::new(),
            radices: Vec::new(),
        }
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    pub fn radices(&self) -> &[usize] {
        &self.radices
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Number of joint parent configurations (1 without parents).
    pub fn count(&self) -> usize {
        self.radices.iter().product()
    }

    /// Joint index of the parents' current states, read through `value`.
    ///
    /// `None` when any parent state is unknown.
    #[inline]
    pub fn index(&self, mut value: impl FnMut(usize) -> Option<usize>) -> Option<usize> {
        let mut index = 0;
        let mut stride = 1;
        for (&parent, &radix) in self.parents.iter().zip(&self.radices) {
            let state = value(parent)?;
            if state >= radix {
                return None;
            }
            index += state * stride;
            stride *= radix;
        }
        Some(index)
    }

    /// Individual parent states of a joint index.
    pub fn decode(&self, mut index: usize) -> Vec<usize> {
        self.radices
            .iter()
            .map(|&radix| {
                let state = index % radix;
                index /= radix;
                state
            })
            .collect()
    }
}

/// Statistics and parameters of a fitted node, by model family.
#[derive(Debug, Clone)]
pub enum NodeModel {
    /// Static node: state counts and a conditional probability table.
    Bn { stats: BnStatistics, cpt: Cpt },
    /// Temporal node: transition statistics and a conditional intensity model.
    Ctbn { stats: CtbnStatistics, cim: Cim },
}

impl NodeModel {
    pub fn parents(&self) -> &ParentConfig {
        match self {
            NodeModel::Bn { stats, .. } => stats.parents(),
            NodeModel::Ctbn { stats, .. } => stats.parents(),
        }
    }

    pub fn cpt(&self) -> Option<&Cpt> {
        match self {
            NodeModel::Bn { cpt, .. } => Some(cpt),
            NodeModel::Ctbn { .. } => None,
        }
    }

    pub fn cim(&self) -> Option<&Cim> {
        match self {
            NodeModel::Ctbn { cim, .. } => Some(cim),
            NodeModel::Bn { .. } => None,
        }
    }

    /// Free parameters of the fitted table.
    pub fn free_parameters(&self) -> usize {
        match self {
            NodeModel::Bn { stats, .. } => stats.free_parameters(),
            NodeModel::Ctbn { stats, .. } => stats.free_parameters(),
        }
    }
}

/// A node together with its fitted model.
#[derive(Debug, Clone)]
pub struct FittedNode {
    pub node: Node,
    pub model: NodeModel,
}
