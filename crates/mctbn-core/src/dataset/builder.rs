//! Incremental dataset construction with per-sequence validation.
//!
//! Sequences arrive as rows of raw string cells in header order. A malformed
//! sequence is rejected on its own, logged, and left out; it never aborts the
//! load. Domains are derived from the accepted values when [`DatasetBuilder::build`]
//! runs, unless a fixed domain was registered for the variable.

use super::{sort_domain, Dataset, DatasetError, Sequence, Variable, VariableKind};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use std::collections::HashSet;
use thiserror::Error;

/// Why a sequence was left out of the dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceRejection {
    #[error("sequence has no observations")]
    Empty,

    #[error("row {row}: expected {expected} cells, found {found}")]
    WrongWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: timestamp {value:?} is not a finite number")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: timestamp does not increase")]
    NonIncreasingTime { row: usize },

    #[error("row {row}: class variable {variable} changes value")]
    ClassChanged { row: usize, variable: String },
}

impl SequenceRejection {
    /// Stable short code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            SequenceRejection::Empty => "empty",
            SequenceRejection::WrongWidth { .. } => "wrong_width",
            SequenceRejection::BadTimestamp { .. } => "bad_timestamp",
            SequenceRejection::NonIncreasingTime { .. } => "non_increasing_time",
            SequenceRejection::ClassChanged { .. } => "class_changed",
        }
    }
}

struct PendingSequence {
    times: Vec<f64>,
    /// Cells in variable order.
    rows: Vec<Vec<String>>,
}

/// Builder for [`Dataset`].
pub struct DatasetBuilder {
    header_width: usize,
    time_column: usize,
    time_variable: String,
    /// Header column of each variable, classes first.
    columns: Vec<usize>,
    names: Vec<String>,
    class_count: usize,
    fixed_domains: Vec<Option<Vec<String>>>,
    pending: Vec<PendingSequence>,
    rejected: usize,
    context: LogContext,
}

impl DatasetBuilder {
    /// Start a dataset with the given header.
    ///
    /// Every header column other than the time variable and the class
    /// variables becomes a feature.
    pub fn new(
        header: Vec<String>,
        time_variable: &str,
        class_variables: &[&str],
    ) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for name in &header {
            if !seen.insert(name.as_str()) {
                return Err(DatasetError::DuplicateVariable(name.clone()));
            }
        }
        if class_variables.contains(&time_variable) {
            return Err(DatasetError::TimeIsClass(time_variable.to_string()));
        }
        let position = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DatasetError::MissingVariable(name.to_string()))
        };
        let time_column = position(time_variable)?;

        let mut columns = Vec::with_capacity(header.len().saturating_sub(1));
        let mut classes = HashSet::new();
        for class in class_variables {
            if !classes.insert(*class) {
                return Err(DatasetError::DuplicateVariable(class.to_string()));
            }
            columns.push(position(class)?);
        }
        for (i, name) in header.iter().enumerate() {
            if i != time_column && !class_variables.contains(&name.as_str()) {
                columns.push(i);
            }
        }
        let names: Vec<String> = columns.iter().map(|&c| header[c].clone()).collect();

        Ok(DatasetBuilder {
            header_width: header.len(),
            time_column,
            time_variable: time_variable.to_string(),
            fixed_domains: vec![None; names.len()],
            columns,
            names,
            class_count: class_variables.len(),
            pending: Vec::new(),
            rejected: 0,
            context: LogContext::fresh(),
        })
    }

    /// Log rejections under an existing run id.
    pub fn with_log_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    /// Fix the domain of one variable instead of deriving it from the data.
    ///
    /// Values outside a fixed domain are kept as unseen values.
    pub fn with_domain(mut self, name: &str, values: Vec<String>) -> Result<Self, DatasetError> {
        let index = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| DatasetError::MissingVariable(name.to_string()))?;
        if values.is_empty() {
            return Err(DatasetError::EmptyDomain(name.to_string()));
        }
        self.fixed_domains[index] = Some(values);
        Ok(self)
    }

    /// Reuse every domain of a reference dataset (typically the training set)
    /// for the variables both datasets share.
    pub fn with_domains_from(mut self, reference: &Dataset) -> Self {
        for (i, name) in self.names.iter().enumerate() {
            if let Some(variable) = reference.variable(name) {
                self.fixed_domains[i] = Some(variable.domain.clone());
            }
        }
        self
    }

    /// Number of sequences rejected so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Number of sequences accepted so far.
    pub fn accepted(&self) -> usize {
        self.pending.len()
    }

    /// Validate and add one sequence; returns its index when accepted.
    pub fn add_sequence(&mut self, rows: Vec<Vec<String>>) -> Result<usize, SequenceRejection> {
        match self.validate(rows) {
            Ok(sequence) => {
                self.pending.push(sequence);
                Ok(self.pending.len() - 1)
            }
            Err(rejection) => {
                self.rejected += 1;
                log_event!(
                    self.context,
                    WARN,
                    event_names::DATA_SEQUENCE_REJECTED,
                    Stage::Data,
                    "sequence rejected",
                    reason = rejection.code(),
                    detail = rejection.to_string().as_str(),
                    ordinal = (self.pending.len() + self.rejected) as u64
                );
                Err(rejection)
            }
        }
    }

    fn validate(&self, rows: Vec<Vec<String>>) -> Result<PendingSequence, SequenceRejection> {
        if rows.is_empty() {
            return Err(SequenceRejection::Empty);
        }

        let mut times = Vec::with_capacity(rows.len());
        let mut reordered: Vec<Vec<String>> = Vec::with_capacity(rows.len());
        for (row_num, row) in rows.into_iter().enumerate() {
            if row.len() != self.header_width {
                return Err(SequenceRejection::WrongWidth {
                    row: row_num,
                    expected: self.header_width,
                    found: row.len(),
                });
            }

            let raw_time = &row[self.time_column];
            let time = raw_time
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite())
                .ok_or_else(|| SequenceRejection::BadTimestamp {
                    row: row_num,
                    value: raw_time.clone(),
                })?;
            if let Some(&previous) = times.last() {
                if time <= previous {
                    return Err(SequenceRejection::NonIncreasingTime { row: row_num });
                }
            }
            times.push(time);

            let cells: Vec<String> = self.columns.iter().map(|&c| row[c].clone()).collect();
            if let Some(first) = reordered.first() {
                if let Some(i) = (0..self.class_count).find(|&i| first[i] != cells[i]) {
                    return Err(SequenceRejection::ClassChanged {
                        row: row_num,
                        variable: self.names[i].clone(),
                    });
                }
            }
            reordered.push(cells);
        }

        Ok(PendingSequence {
            times,
            rows: reordered,
        })
    }

    /// Derive domains and encode every accepted sequence.
    pub fn build(self) -> Result<Dataset, DatasetError> {
        if self.pending.is_empty() {
            return Err(DatasetError::Empty);
        }

        let variables: Vec<Variable> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let domain = match &self.fixed_domains[i] {
                    Some(fixed) => fixed.clone(),
                    None => {
                        let mut values: Vec<String> = self
                            .pending
                            .iter()
                            .flat_map(|s| s.rows.iter().map(move |row| row[i].clone()))
                            .collect();
                        sort_domain(&mut values);
                        values
                    }
                };
                Variable {
                    name: name.clone(),
                    domain,
                    kind: if i < self.class_count {
                        VariableKind::Class
                    } else {
                        VariableKind::Feature
                    },
                }
            })
            .collect();

        let sequences: Vec<Sequence> = self
            .pending
            .into_iter()
            .map(|pending| Sequence {
                times: pending.times,
                rows: pending
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .zip(&variables)
                            .map(|(cell, variable)| variable.value_index(cell))
                            .collect()
                    })
                    .collect(),
            })
            .collect();

        log_event!(
            self.context,
            INFO,
            event_names::DATA_LOADED,
            Stage::Data,
            "dataset built",
            sequences = sequences.len() as u64,
            rejected = self.rejected as u64,
            variables = variables.len() as u64
        );

        Ok(Dataset {
            time_variable: self.time_variable,
            variables,
            class_count: self.class_count,
            sequences,
        })
    }
}
