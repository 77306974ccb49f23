//! One evaluation run, from the held-out test set to the persisted document.
//!
//! ```text
//! NotStarted -> DataLoaded -> Evaluating (both models, any order)
//!            -> Compared -> Persisted | Partial
//! ```
//!
//! A model that cannot be loaded or evaluated does not abort the run. It is
//! recorded as unavailable and the run finishes in the terminal `Partial`
//! state with zeroed metrics for that model.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::config::AppConfig;
use crate::dataset::{LabeledMessage, prepare_split};
use crate::error::{Result, SpamError};
use crate::evaluation::comparison::{ComparisonRecord, compare_partial};
use crate::evaluation::metrics::ClassificationMetrics;
use crate::evaluation::store::{ResultDocument, save};
use crate::ml::{ModelKind, SpamClassifier, load_classifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    DataLoaded,
    Evaluating,
    Compared,
    Persisted,
    /// Persisted with at least one model unavailable.
    Partial,
}

/// What happened when a model was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    Evaluated(ClassificationMetrics),
    Unavailable(String),
}

impl ModelOutcome {
    pub fn metrics(&self) -> Option<&ClassificationMetrics> {
        match self {
            ModelOutcome::Evaluated(metrics) => Some(metrics),
            ModelOutcome::Unavailable(_) => None,
        }
    }
}

/// State of one evaluation run.
#[derive(Debug)]
pub struct EvaluationRun {
    state: RunState,
    test_set: Vec<LabeledMessage>,
    outcomes: BTreeMap<ModelKind, ModelOutcome>,
    record: Option<ComparisonRecord>,
}

impl Default for EvaluationRun {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationRun {
    pub fn new() -> Self {
        Self {
            state: RunState::NotStarted,
            test_set: Vec::new(),
            outcomes: BTreeMap::new(),
            record: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn outcome(&self, kind: ModelKind) -> Option<&ModelOutcome> {
        self.outcomes.get(&kind)
    }

    pub fn record(&self) -> Option<&ComparisonRecord> {
        self.record.as_ref()
    }

    fn expect_state(&self, allowed: &[RunState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SpamError::invalid_operation(format!(
                "cannot {operation} in state {:?}",
                self.state
            )))
        }
    }

    /// Provide the held-out test set.
    pub fn load_data(&mut self, test_set: Vec<LabeledMessage>) -> Result<()> {
        self.expect_state(&[RunState::NotStarted], "load data")?;
        if test_set.is_empty() {
            return Err(SpamError::empty_dataset("test set is empty"));
        }

        info!("Evaluation run loaded {} test messages", test_set.len());
        self.test_set = test_set;
        self.state = RunState::DataLoaded;
        Ok(())
    }

    /// Evaluate a loaded classifier on the test set.
    ///
    /// Failures other than metric bugs mark the model unavailable instead of
    /// failing the run.
    pub fn evaluate(&mut self, classifier: &dyn SpamClassifier) -> Result<&ModelOutcome> {
        let kind = classifier.kind();
        self.begin_model(kind)?;

        let outcome = match classifier.evaluate(&self.test_set) {
            Ok(metrics) => ModelOutcome::Evaluated(metrics),
            Err(e) if e.is_metric_error() => return Err(e),
            Err(e) => {
                warn!("Evaluation of {kind} model failed: {e}");
                ModelOutcome::Unavailable(e.to_string())
            }
        };

        Ok(self.finish_model(kind, outcome))
    }

    /// Record that a model could not be loaded.
    pub fn mark_unavailable<S: Into<String>>(
        &mut self,
        kind: ModelKind,
        reason: S,
    ) -> Result<&ModelOutcome> {
        self.begin_model(kind)?;
        let reason = reason.into();
        warn!("{kind} model unavailable: {reason}");
        Ok(self.finish_model(kind, ModelOutcome::Unavailable(reason)))
    }

    /// Evaluate the result of loading a classifier, whether it loaded or not.
    pub fn evaluate_loaded(
        &mut self,
        kind: ModelKind,
        loaded: Result<Box<dyn SpamClassifier>>,
    ) -> Result<&ModelOutcome> {
        match loaded {
            Ok(classifier) => self.evaluate(classifier.as_ref()),
            Err(e) => self.mark_unavailable(kind, e.to_string()),
        }
    }

    fn begin_model(&self, kind: ModelKind) -> Result<()> {
        self.expect_state(
            &[RunState::DataLoaded, RunState::Evaluating],
            "evaluate a model",
        )?;
        if self.outcomes.contains_key(&kind) {
            return Err(SpamError::invalid_operation(format!(
                "{kind} model was already evaluated in this run"
            )));
        }
        Ok(())
    }

    fn finish_model(&mut self, kind: ModelKind, outcome: ModelOutcome) -> &ModelOutcome {
        self.state = RunState::Evaluating;
        self.outcomes.entry(kind).or_insert(outcome)
    }

    /// Compare the two models once both have an outcome.
    pub fn compare(&mut self, target_f1: f64) -> Result<&ComparisonRecord> {
        self.expect_state(&[RunState::Evaluating], "compare")?;
        if let Some(missing) = ModelKind::ALL
            .iter()
            .find(|kind| !self.outcomes.contains_key(kind))
        {
            return Err(SpamError::invalid_operation(format!(
                "cannot compare before the {missing} model has been evaluated"
            )));
        }

        let metrics = |kind: ModelKind| self.outcomes.get(&kind).and_then(ModelOutcome::metrics);
        let record = compare_partial(
            metrics(ModelKind::Baseline),
            metrics(ModelKind::Challenger),
            target_f1,
            ModelKind::Baseline.as_str(),
            ModelKind::Challenger.as_str(),
        )?;

        info!(
            "Best model: {} (improvement {:.4}, target {:.2})",
            record.best_model, record.improvement, record.target_f1
        );
        self.state = RunState::Compared;
        Ok(self.record.insert(record))
    }

    /// Persist the comparison document at `path`.
    pub fn persist<P: AsRef<Path>>(&mut self, path: P) -> Result<ResultDocument> {
        self.expect_state(&[RunState::Compared], "persist")?;
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| SpamError::invalid_operation("no comparison to persist"))?;

        let document = save(record, &record.baseline, &record.challenger, path)?;

        let degraded = self
            .outcomes
            .values()
            .any(|outcome| outcome.metrics().is_none());
        self.state = if degraded {
            RunState::Partial
        } else {
            RunState::Persisted
        };
        Ok(document)
    }
}

/// Run the whole evaluation for a configuration: load the persisted test set,
/// evaluate both trained models, compare and write the result document.
pub fn run_full_evaluation(config: &AppConfig) -> Result<(ResultDocument, RunState)> {
    let split = prepare_split(config)?;

    let mut run = EvaluationRun::new();
    run.load_data(split.test)?;

    for kind in ModelKind::ALL {
        run.evaluate_loaded(kind, load_classifier(kind, config))?;
    }

    run.compare(config.evaluation.target_f1_score)?;
    let document = run.persist(config.paths.results_file())?;
    Ok((document, run.state()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;
    use crate::evaluation::store::load;
    use crate::ml::{Prediction, TrainingSummary};
    use tempfile::TempDir;

    /// Predicts SPAM when the message contains "free".
    struct KeywordClassifier {
        kind: ModelKind,
    }

    impl SpamClassifier for KeywordClassifier {
        fn kind(&self) -> ModelKind {
            self.kind
        }

        fn name(&self) -> &str {
            "keyword"
        }

        fn is_trained(&self) -> bool {
            true
        }

        fn hyperparameters(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }

        fn train(&mut self, _messages: &[LabeledMessage]) -> Result<TrainingSummary> {
            unimplemented!()
        }

        fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let p_spam = if t.contains("free") { 0.9 } else { 0.1 };
                    Prediction::from_spam_probability(p_spam)
                })
                .collect())
        }

        fn save(&self, _models_dir: &Path) -> Result<()> {
            Ok(())
        }

        fn load(&mut self, _models_dir: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn test_set() -> Vec<LabeledMessage> {
        vec![
            LabeledMessage::new("free prize", Label::Spam),
            LabeledMessage::new("free cash", Label::Spam),
            LabeledMessage::new("win now", Label::Spam),
            LabeledMessage::new("see you", Label::Ham),
            LabeledMessage::new("free for lunch", Label::Ham),
        ]
    }

    #[test]
    fn test_full_run_reaches_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let mut run = EvaluationRun::new();
        assert_eq!(run.state(), RunState::NotStarted);

        run.load_data(test_set()).unwrap();
        assert_eq!(run.state(), RunState::DataLoaded);

        run.evaluate(&KeywordClassifier {
            kind: ModelKind::Challenger,
        })
        .unwrap();
        run.evaluate(&KeywordClassifier {
            kind: ModelKind::Baseline,
        })
        .unwrap();
        assert_eq!(run.state(), RunState::Evaluating);

        let record = run.compare(0.5).unwrap();
        // Identical models tie, and the baseline wins ties.
        assert_eq!(record.best_model, "baseline");
        assert_eq!(record.improvement, 0.0);

        run.persist(&path).unwrap();
        assert_eq!(run.state(), RunState::Persisted);

        let (record, baseline, _) = load(&path).unwrap();
        assert_eq!(baseline.confusion_matrix, [[1, 1], [1, 2]]);
        assert_eq!(record.best_model, "baseline");
    }

    #[test]
    fn test_unavailable_challenger_gives_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let mut run = EvaluationRun::new();
        run.load_data(test_set()).unwrap();

        run.evaluate(&KeywordClassifier {
            kind: ModelKind::Baseline,
        })
        .unwrap();
        let outcome = run
            .evaluate_loaded(
                ModelKind::Challenger,
                Err(SpamError::model_unavailable("no artifact")),
            )
            .unwrap();
        assert!(outcome.metrics().is_none());

        let record = run.compare(0.95).unwrap().clone();
        assert_eq!(record.best_model, "baseline");
        assert!(record.challenger.is_zeroed());
        assert!(!record.challenger_achieves_target);

        let document = run.persist(&path).unwrap();
        assert_eq!(run.state(), RunState::Partial);
        assert!(document.summary.unwrap().partial);
    }

    #[test]
    fn test_out_of_order_operations() {
        let mut run = EvaluationRun::new();
        let keyword = KeywordClassifier {
            kind: ModelKind::Baseline,
        };

        assert!(matches!(
            run.evaluate(&keyword),
            Err(SpamError::InvalidOperation(_))
        ));
        assert!(matches!(run.compare(0.9), Err(SpamError::InvalidOperation(_))));

        run.load_data(test_set()).unwrap();
        assert!(matches!(
            run.load_data(test_set()),
            Err(SpamError::InvalidOperation(_))
        ));

        run.evaluate(&keyword).unwrap();
        // Same model twice.
        assert!(matches!(
            run.evaluate(&keyword),
            Err(SpamError::InvalidOperation(_))
        ));
        // Challenger still missing.
        assert!(matches!(run.compare(0.9), Err(SpamError::InvalidOperation(_))));
        assert!(matches!(
            run.persist("unused.json"),
            Err(SpamError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_both_unavailable_fails_comparison() {
        let mut run = EvaluationRun::new();
        run.load_data(test_set()).unwrap();
        run.mark_unavailable(ModelKind::Baseline, "missing").unwrap();
        run.mark_unavailable(ModelKind::Challenger, "missing").unwrap();

        assert!(matches!(
            run.compare(0.95),
            Err(SpamError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_test_set() {
        let mut run = EvaluationRun::new();
        assert!(matches!(
            run.load_data(Vec::new()),
            Err(SpamError::EmptyDataset(_))
        ));
    }
}
