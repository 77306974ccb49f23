//! Model evaluation and comparison.
//!
//! - [`metrics`] turns true/predicted labels into [`ClassificationMetrics`].
//! - [`comparison`] picks the better of two models against an F1 target.
//! - [`store`] persists and reloads the comparison document.
//! - [`pipeline`] drives one evaluation run end to end, including the
//!   degraded single-model mode.

pub mod comparison;
pub mod metrics;
pub mod pipeline;
pub mod store;

pub use comparison::{ComparisonRecord, compare, compare_partial};
pub use metrics::{ClassificationMetrics, compute, compute_from_indices};
pub use pipeline::{EvaluationRun, ModelOutcome, RunState, run_full_evaluation};
pub use store::{ResultDocument, RunSummary, load, load_document, save};
