//! Binary classification metrics.
//!
//! Conventions:
//! - `confusion_matrix[i][j]` counts messages whose true label has index `i`
//!   and whose predicted label has index `j` (HAM = 0, SPAM = 1).
//! - A precision or recall with a zero denominator is `0.0`, never NaN.
//! - Top-level `f1`, `precision` and `recall` are averages of the per-class
//!   values weighted by the share of each class among the true labels.

use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::error::{Result, SpamError};

/// Metrics of one model on one test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// Support-weighted F1.
    #[serde(rename = "f1_score", alias = "f1")]
    pub f1: f64,
    pub accuracy: f64,
    /// Support-weighted precision.
    pub precision: f64,
    /// Support-weighted recall.
    pub recall: f64,
    pub precision_ham: f64,
    pub recall_ham: f64,
    pub precision_spam: f64,
    pub recall_spam: f64,
    pub confusion_matrix: [[u64; 2]; 2],
}

impl ClassificationMetrics {
    /// All-zero metrics, used in place of a model that could not be evaluated.
    pub fn zeroed() -> Self {
        ClassificationMetrics {
            f1: 0.0,
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            precision_ham: 0.0,
            recall_ham: 0.0,
            precision_spam: 0.0,
            recall_spam: 0.0,
            confusion_matrix: [[0, 0], [0, 0]],
        }
    }

    /// Number of examples the metrics were computed over.
    pub fn total(&self) -> u64 {
        self.confusion_matrix.iter().flatten().sum()
    }

    /// Whether these are the placeholder metrics of an unavailable model.
    pub fn is_zeroed(&self) -> bool {
        self.total() == 0
    }

    /// Build the metrics from a confusion matrix.
    pub fn from_confusion_matrix(cm: [[u64; 2]; 2]) -> Result<Self> {
        let total: u64 = cm.iter().flatten().sum();
        if total == 0 {
            return Err(SpamError::metric("cannot compute metrics over zero examples"));
        }

        let mut precision = [0.0; 2];
        let mut recall = [0.0; 2];
        let mut f1 = [0.0; 2];
        let mut support = [0u64; 2];

        for c in 0..2 {
            let tp = cm[c][c];
            let predicted = cm[0][c] + cm[1][c];
            let actual = cm[c][0] + cm[c][1];

            precision[c] = ratio(tp, predicted);
            recall[c] = ratio(tp, actual);
            f1[c] = harmonic_mean(precision[c], recall[c]);
            support[c] = actual;
        }

        let weight = |c: usize| support[c] as f64 / total as f64;
        let weighted = |values: &[f64; 2]| values[0] * weight(0) + values[1] * weight(1);

        Ok(ClassificationMetrics {
            f1: weighted(&f1),
            accuracy: ratio(cm[0][0] + cm[1][1], total),
            precision: weighted(&precision),
            recall: weighted(&recall),
            precision_ham: precision[Label::Ham.index()],
            recall_ham: recall[Label::Ham.index()],
            precision_spam: precision[Label::Spam.index()],
            recall_spam: recall[Label::Spam.index()],
            confusion_matrix: cm,
        })
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(p: f64, r: f64) -> f64 {
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Compute metrics from true and predicted labels.
///
/// # Errors
///
/// - [`SpamError::LengthMismatch`] if the sequences differ in length.
/// - [`SpamError::MetricComputation`] if they are empty.
pub fn compute(y_true: &[Label], y_pred: &[Label]) -> Result<ClassificationMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(SpamError::LengthMismatch {
            y_true: y_true.len(),
            y_pred: y_pred.len(),
        });
    }

    let mut cm = [[0u64; 2]; 2];
    for (t, p) in y_true.iter().zip(y_pred) {
        cm[t.index()][p.index()] += 1;
    }

    ClassificationMetrics::from_confusion_matrix(cm)
}

/// Compute metrics from raw `{0, 1}` label indices.
pub fn compute_from_indices(y_true: &[u8], y_pred: &[u8]) -> Result<ClassificationMetrics> {
    let to_labels = |values: &[u8]| -> Result<Vec<Label>> {
        values
            .iter()
            .map(|&v| Label::try_from(v).map_err(|e| SpamError::metric(e.to_string())))
            .collect()
    };

    compute(&to_labels(y_true)?, &to_labels(y_pred)?)
}
