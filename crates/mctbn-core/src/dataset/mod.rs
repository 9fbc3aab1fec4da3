//! In-memory dataset of labeled multivariate event sequences.
//!
//! A [`Dataset`] is built once through [`DatasetBuilder`] and never mutated
//! afterwards. Variables are partitioned into one time variable, zero or more
//! class variables (constant within a sequence) and the remaining feature
//! variables. Every variable has an ordered finite domain, and each observed
//! value is stored as an index into that domain.
//!
//! Learning does not read raw values from the dataset. It reads a
//! [`BoundDataset`], where each node's domain has been matched against the
//! dataset's columns by name and value.

mod binding;
mod builder;

pub use binding::{BoundDataset, BoundSequence, DomainBinding, VariableSpec};
pub use builder::{DatasetBuilder, SequenceRejection};

use mctbn_common::State;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or querying a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("variable {0} not found in header")]
    MissingVariable(String),

    #[error("variable {0} appears more than once in header")]
    DuplicateVariable(String),

    #[error("time variable {0} cannot also be a class variable")]
    TimeIsClass(String),

    #[error("fixed domain for {0} is empty")]
    EmptyDomain(String),

    #[error("no sequence was accepted")]
    Empty,
}

impl From<DatasetError> for mctbn_common::Error {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::MissingVariable(name) => mctbn_common::Error::MissingVariable { name },
            DatasetError::Empty => mctbn_common::Error::EmptyDataset,
            other => mctbn_common::Error::Data(other.to_string()),
        }
    }
}

/// Role of a variable in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Class,
    Feature,
}

/// A discrete variable and its ordered domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub domain: Vec<String>,
    pub kind: VariableKind,
}

impl Variable {
    pub fn cardinality(&self) -> usize {
        self.domain.len()
    }

    /// Index of `value` in the domain.
    pub fn value_index(&self, value: &str) -> Option<usize> {
        self.domain.iter().position(|v| v == value)
    }
}

/// One case: strictly increasing timestamps and one row of value indices per
/// timestamp. `None` marks a value outside a fixed domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub times: Vec<f64>,
    pub rows: Vec<Vec<Option<usize>>>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Total observed duration.
    pub fn duration(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Result of an aggregate count query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounts {
    /// Observations matching the whole assignment.
    pub observations: usize,
    /// Sequences with at least one matching observation.
    pub sequences: usize,
}

/// Immutable collection of sequences over a fixed set of variables.
///
/// Variables are ordered class variables first, then features, each group in
/// header order.
#[derive(Debug, Clone)]
pub struct Dataset {
    time_variable: String,
    variables: Vec<Variable>,
    class_count: usize,
    sequences: Vec<Sequence>,
}

impl Dataset {
    pub fn time_variable(&self) -> &str {
        &self.time_variable
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn class_variables(&self) -> &[Variable] {
        &self.variables[..self.class_count]
    }

    pub fn feature_variables(&self) -> &[Variable] {
        &self.variables[self.class_count..]
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn num_observations(&self) -> usize {
        self.sequences.iter().map(Sequence::len).sum()
    }

    /// Class labels of one sequence, read from its first observation.
    ///
    /// `None` when the sequence does not exist or a class value lies outside
    /// its fixed domain.
    pub fn class_assignment(&self, sequence: usize) -> Option<State> {
        let row = self.sequences.get(sequence)?.rows.first()?;
        let mut pairs = Vec::with_capacity(self.class_count);
        for (i, variable) in self.class_variables().iter().enumerate() {
            let value = row[i].and_then(|k| variable.domain.get(k))?;
            pairs.push((variable.name.clone(), value.clone()));
        }
        Some(State::new(pairs))
    }

    /// Count observations and sequences matching a partial assignment.
    ///
    /// Naming a variable the dataset lacks is an error; a value outside the
    /// variable's domain simply matches nothing.
    pub fn count_matching(&self, assignment: &State) -> Result<MatchCounts, DatasetError> {
        let mut wanted = Vec::with_capacity(assignment.len());
        for (name, value) in assignment.iter() {
            let index = self
                .variable_index(name)
                .ok_or_else(|| DatasetError::MissingVariable(name.to_string()))?;
            match self.variables[index].value_index(value) {
                Some(k) => wanted.push((index, k)),
                None => return Ok(MatchCounts::default()),
            }
        }

        let mut counts = MatchCounts::default();
        for sequence in &self.sequences {
            let matching = sequence
                .rows
                .iter()
                .filter(|row| wanted.iter().all(|&(i, k)| row[i] == Some(k)))
                .count();
            counts.observations += matching;
            if matching > 0 {
                counts.sequences += 1;
            }
        }
        Ok(counts)
    }
}

/// Sort distinct values numerically when every one parses as a number,
/// lexicographically otherwise.
pub(crate) fn sort_domain(values: &mut Vec<String>) {
    values.sort();
    values.dedup();
    let numeric: Option<Vec<f64>> = values.iter().map(|v| v.trim().parse::<f64>().ok()).collect();
    if let Some(keys) = numeric {
        let mut paired: Vec<(f64, String)> = keys.into_iter().zip(values.drain(..)).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        values.extend(paired.into_iter().map(|(_, v)| v));
    }
}
