//! Binary logistic regression on sparse features.
//!
//! Minimizes the mean log loss plus an L2 penalty `||w||² / (2·C·n)` with
//! full-batch gradient descent from a zero initialization, so training is
//! deterministic. The intercept is not penalized. The configured learning
//! rate is capped so that strong regularization cannot make the descent
//! diverge.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::error::{Result, SpamError};
use crate::ml::tfidf::SparseVector;

/// Outcome of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
    /// Inverse regularization strength.
    c: f64,
    max_iter: usize,
    learning_rate: f64,
    tol: f64,
}

#[inline]
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize, learning_rate: f64, tol: f64) -> Self {
        Self {
            weights: Vec::new(),
            bias: 0.0,
            c,
            max_iter,
            learning_rate,
            tol,
        }
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Fit on `x` (rows with indices below `n_features`) and labels `y`.
    pub fn fit(&mut self, x: &[SparseVector], y: &[Label], n_features: usize) -> Result<FitReport> {
        if x.len() != y.len() {
            return Err(SpamError::LengthMismatch {
                y_true: y.len(),
                y_pred: x.len(),
            });
        }
        if x.is_empty() {
            return Err(SpamError::data("cannot fit logistic regression on zero rows"));
        }

        let n = x.len() as f64;
        let targets: Vec<f64> = y.iter().map(|label| label.index() as f64).collect();
        let l2 = 1.0 / (self.c * n);

        // Cap the step at 1/L, L being a Lipschitz bound of the gradient.
        let max_sq_norm = x
            .iter()
            .map(|row| row.iter().map(|(_, v)| v * v).sum::<f64>())
            .fold(0.0, f64::max);
        let lipschitz = 0.25 * (max_sq_norm + 1.0) + l2;
        let step = self.learning_rate.min(1.0 / lipschitz);

        self.weights = vec![0.0; n_features];
        self.bias = 0.0;

        let mut grad_w = vec![0.0; n_features];
        let mut report = FitReport {
            iterations: 0,
            converged: false,
            final_loss: f64::NAN,
        };

        for iteration in 1..=self.max_iter {
            for (g, w) in grad_w.iter_mut().zip(&self.weights) {
                *g = l2 * w;
            }
            let mut grad_b = 0.0;
            let mut loss = 0.0;

            for (row, &target) in x.iter().zip(&targets) {
                let p = sigmoid(self.decision_function(row));
                let error = p - target;
                for &(j, v) in row {
                    grad_w[j] += error * v / n;
                }
                grad_b += error / n;
                loss -= target * p.max(f64::MIN_POSITIVE).ln()
                    + (1.0 - target) * (1.0 - p).max(f64::MIN_POSITIVE).ln();
            }

            let penalty: f64 = self.weights.iter().map(|w| w * w).sum::<f64>() * l2 / 2.0;
            report.final_loss = loss / n + penalty;
            report.iterations = iteration;

            let max_grad = grad_w
                .iter()
                .fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            if max_grad < self.tol {
                report.converged = true;
                break;
            }

            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= step * g;
            }
            self.bias -= step * grad_b;
        }

        debug!(
            "Logistic regression: {} iterations, converged={}, loss={:.6}",
            report.iterations, report.converged, report.final_loss
        );
        Ok(report)
    }

    /// Log-odds of SPAM for one row. Unknown feature indices are ignored.
    pub fn decision_function(&self, row: &SparseVector) -> f64 {
        row.iter()
            .filter_map(|&(j, v)| self.weights.get(j).map(|w| w * v))
            .sum::<f64>()
            + self.bias
    }

    /// Probability of SPAM for one row.
    pub fn predict_proba(&self, row: &SparseVector) -> f64 {
        sigmoid(self.decision_function(row))
    }
}
