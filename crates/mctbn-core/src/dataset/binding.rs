//! Matching node domains against dataset columns.
//!
//! Nodes and datasets are built independently: an evaluation fold or a
//! prediction set may order its columns differently, miss the class columns,
//! or carry values the training data never showed. A [`DomainBinding`] maps
//! each node to a column by name and each column value to a node state by
//! value, and [`BoundDataset`] is the dataset re-encoded in node space.
//! Values with no node state become `None`.

use super::{Dataset, DatasetError};
use crate::logging::LogContext;

/// Name and domain of one node, in node index order.
#[derive(Debug, Clone, Copy)]
pub struct VariableSpec<'a> {
    pub name: &'a str,
    pub domain: &'a [String],
}

#[derive(Debug, Clone)]
struct ColumnMap {
    column: usize,
    /// Node state of every dataset value index.
    states: Vec<Option<usize>>,
}

/// Mapping from node indices to dataset columns and values.
#[derive(Debug, Clone)]
pub struct DomainBinding {
    columns: Vec<Option<ColumnMap>>,
}

impl DomainBinding {
    /// Bind every node; a node without a matching column is an error.
    pub fn new(dataset: &Dataset, specs: &[VariableSpec<'_>]) -> Result<Self, DatasetError> {
        let binding = Self::lenient(dataset, specs);
        if let Some(i) = binding.columns.iter().position(Option::is_none) {
            return Err(DatasetError::MissingVariable(specs[i].name.to_string()));
        }
        Ok(binding)
    }

    /// Bind the nodes the dataset has; the others read as unobserved.
    pub fn lenient(dataset: &Dataset, specs: &[VariableSpec<'_>]) -> Self {
        let columns = specs
            .iter()
            .map(|spec| {
                let column = dataset.variable_index(spec.name)?;
                let states = dataset.variables()[column]
                    .domain
                    .iter()
                    .map(|value| spec.domain.iter().position(|d| d == value))
                    .collect();
                Some(ColumnMap { column, states })
            })
            .collect();
        DomainBinding { columns }
    }

    pub fn num_nodes(&self) -> usize {
        self.columns.len()
    }

    pub fn is_bound(&self, node: usize) -> bool {
        matches!(self.columns.get(node), Some(Some(_)))
    }

    /// Re-encode the dataset in node space.
    pub fn bind(&self, dataset: &Dataset) -> BoundDataset {
        let sequences = dataset
            .sequences()
            .iter()
            .map(|sequence| BoundSequence {
                times: sequence.times.clone(),
                values: sequence
                    .rows
                    .iter()
                    .map(|row| {
                        self.columns
                            .iter()
                            .map(|map| {
                                let map = map.as_ref()?;
                                let k = row[map.column]?;
                                map.states.get(k).copied().flatten()
                            })
                            .collect()
                    })
                    .collect(),
            })
            .collect();
        BoundDataset {
            sequences,
            num_nodes: self.columns.len(),
            context: LogContext::fresh(),
        }
    }
}

/// One sequence in node space.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSequence {
    pub times: Vec<f64>,
    /// `values[observation][node]`
    pub values: Vec<Vec<Option<usize>>>,
}

impl BoundSequence {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[inline]
    pub fn value(&self, observation: usize, node: usize) -> Option<usize> {
        self.values[observation][node]
    }

    /// Consecutive observation pairs as `(earlier index, elapsed time)`.
    pub fn intervals(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.times
            .windows(2)
            .enumerate()
            .map(|(i, pair)| (i, pair[1] - pair[0]))
    }
}

/// A dataset encoded against a fixed list of node domains.
///
/// Statistics over it report skipped updates to its run's [`LogContext`].
#[derive(Debug, Clone)]
pub struct BoundDataset {
    sequences: Vec<BoundSequence>,
    num_nodes: usize,
    context: LogContext,
}

impl BoundDataset {
    /// Bind every node strictly.
    pub fn new(dataset: &Dataset, specs: &[VariableSpec<'_>]) -> Result<Self, DatasetError> {
        Ok(DomainBinding::new(dataset, specs)?.bind(dataset))
    }

    /// Attach the run this dataset is used in.
    pub fn with_log_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    pub fn log_context(&self) -> &LogContext {
        &self.context
    }

    pub fn sequences(&self) -> &[BoundSequence] {
        &self.sequences
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetBuilder;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn dataset() -> Dataset {
        let mut b = DatasetBuilder::new(strings(&["t", "F", "C"]), "t", &["C"]).unwrap();
        b.add_sequence(vec![
            strings(&["0", "a", "1"]),
            strings(&["1.5", "b", "1"]),
            strings(&["2", "q", "1"]),
        ])
        .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_binding_maps_by_name_and_value() {
        let data = dataset();
        let class_domain = strings(&["1", "2"]);
        let feature_domain = strings(&["b", "a"]);
        let specs = [
            VariableSpec {
                name: "C",
                domain: &class_domain,
            },
            VariableSpec {
                name: "F",
                domain: &feature_domain,
            },
        ];
        let bound = BoundDataset::new(&data, &specs).unwrap();
        let seq = &bound.sequences()[0];
        assert_eq!(seq.value(0, 0), Some(0));
        assert_eq!(seq.value(0, 1), Some(1));
        assert_eq!(seq.value(1, 1), Some(0));
        // "q" is not a node state
        assert_eq!(seq.value(2, 1), None);
    }

    #[test]
    fn test_intervals() {
        let data = dataset();
        let domain = strings(&["a", "b", "q"]);
        let bound = BoundDataset::new(
            &data,
            &[VariableSpec {
                name: "F",
                domain: &domain,
            }],
        )
        .unwrap();
        let intervals: Vec<_> = bound.sequences()[0].intervals().collect();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].0, 0);
        assert!((intervals[0].1 - 1.5).abs() < 1e-12);
        assert!((intervals[1].1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_strict_binding_requires_every_node() {
        let data = dataset();
        let domain = strings(&["x"]);
        let specs = [VariableSpec {
            name: "G",
            domain: &domain,
        }];
        assert!(matches!(
            DomainBinding::new(&data, &specs),
            Err(DatasetError::MissingVariable(_))
        ));

        let lenient = DomainBinding::lenient(&data, &specs);
        assert!(!lenient.is_bound(0));
        let bound = lenient.bind(&data);
        assert_eq!(bound.sequences()[0].value(0, 0), None);
    }
}
