//! Sufficient statistics per node and parent set.
//!
//! Every array is pre-filled with Bayesian pseudo-counts before the data pass;
//! maximum likelihood is the all-zero prior. The equivalent sample size is
//! spread evenly over parent configurations and states, so the total prior
//! mass of a node does not depend on its cardinality.
//!
//! A value or parent configuration outside the node domain (an evaluation
//! fold showing a state the training data never did) skips that one update
//! with [`UpdateOutcome::Skipped`] and a warning rate-limited per run.

mod bn;
mod ctbn;

pub use bn::BnStatistics;
pub use ctbn::CtbnStatistics;

use crate::logging::{event_names, LogContext, Stage};
use serde::{Deserialize, Serialize};

/// Why an update was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The node's own value is outside its domain.
    UnseenNodeState,
    /// A parent's value is outside its domain.
    UnseenParentConfiguration,
    /// The value after the interval is outside the domain.
    UnseenDestination,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnseenNodeState => "unseen_node_state",
            SkipReason::UnseenParentConfiguration => "unseen_parent_configuration",
            SkipReason::UnseenDestination => "unseen_destination",
        }
    }
}

/// Result of one accumulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Skipped(SkipReason),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

pub(crate) fn report_skip(context: &LogContext, node: usize, reason: SkipReason) {
    if let Some(occurrences) = context.warnings.unseen_state.hit() {
        crate::log_event!(
            context,
            WARN,
            event_names::STATS_UNSEEN_STATE,
            Stage::Statistics,
            "update skipped for a state outside the node domain",
            node_index = node as u64,
            reason = reason.as_str(),
            occurrences = occurrences
        );
    }
}
