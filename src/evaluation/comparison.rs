//! Two-model comparison against an F1 target.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpamError};
use crate::evaluation::metrics::ClassificationMetrics;

/// Outcome of comparing the baseline with the challenger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub baseline: ClassificationMetrics,
    #[serde(alias = "distilbert")]
    pub challenger: ClassificationMetrics,
    pub baseline_name: String,
    pub challenger_name: String,
    pub target_f1: f64,
    /// Name of the model with the higher F1. Ties go to the baseline.
    pub best_model: String,
    /// Absolute F1 difference between the two models.
    pub improvement: f64,
    pub baseline_achieves_target: bool,
    #[serde(alias = "distilbert_achieves_target")]
    pub challenger_achieves_target: bool,
}

impl ComparisonRecord {
    /// Metrics of the winning model.
    pub fn best_metrics(&self) -> &ClassificationMetrics {
        if self.best_model == self.challenger_name && self.best_model != self.baseline_name {
            &self.challenger
        } else {
            &self.baseline
        }
    }

    /// Whether the winning model reaches the target.
    pub fn target_achieved(&self) -> bool {
        if self.best_model == self.challenger_name && self.best_model != self.baseline_name {
            self.challenger_achieves_target
        } else {
            self.baseline_achieves_target
        }
    }
}

/// Compare two models by F1.
///
/// `b` wins only when its F1 is strictly greater, so ties go to `name_a`.
/// A model achieves the target when its F1 is greater than or equal to
/// `target_f1`.
pub fn compare(
    a: &ClassificationMetrics,
    b: &ClassificationMetrics,
    target_f1: f64,
    name_a: &str,
    name_b: &str,
) -> ComparisonRecord {
    let best_model = if b.f1 > a.f1 { name_b } else { name_a };

    ComparisonRecord {
        baseline: a.clone(),
        challenger: b.clone(),
        baseline_name: name_a.to_string(),
        challenger_name: name_b.to_string(),
        target_f1,
        best_model: best_model.to_string(),
        improvement: (a.f1 - b.f1).abs(),
        baseline_achieves_target: a.f1 >= target_f1,
        challenger_achieves_target: b.f1 >= target_f1,
    }
}

/// Compare when one of the models may be unavailable.
///
/// A missing model gets zeroed metrics and never achieves the target, and
/// the available model is reported as best regardless of scores.
///
/// # Errors
///
/// [`SpamError::ModelUnavailable`] when neither model has metrics.
pub fn compare_partial(
    a: Option<&ClassificationMetrics>,
    b: Option<&ClassificationMetrics>,
    target_f1: f64,
    name_a: &str,
    name_b: &str,
) -> Result<ComparisonRecord> {
    let zeroed = ClassificationMetrics::zeroed();

    match (a, b) {
        (Some(a), Some(b)) => Ok(compare(a, b, target_f1, name_a, name_b)),
        (Some(a), None) => {
            let mut record = compare(a, &zeroed, target_f1, name_a, name_b);
            record.best_model = name_a.to_string();
            record.challenger_achieves_target = false;
            Ok(record)
        }
        (None, Some(b)) => {
            let mut record = compare(&zeroed, b, target_f1, name_a, name_b);
            record.best_model = name_b.to_string();
            record.baseline_achieves_target = false;
            Ok(record)
        }
        (None, None) => Err(SpamError::model_unavailable(format!(
            "neither '{name_a}' nor '{name_b}' could be evaluated"
        ))),
    }
}
