//! Multidimensional classifier: learning entry point, prediction and
//! model summary.

mod classifier;
pub mod inference;
mod summary;

pub use classifier::{Mctbnc, Prediction};
pub use inference::{ClassSpace, Posterior};
pub use summary::{EdgeSummary, ModelSummary, NodeSummary, SubModelSummary};
