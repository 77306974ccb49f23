//! Train one model, score it on the held-out set, save it and record the run.

use std::path::PathBuf;

use log::{info, warn};

use crate::config::AppConfig;
use crate::dataset::DatasetSplit;
use crate::error::Result;
use crate::evaluation::ClassificationMetrics;
use crate::ml::classifier::{ModelKind, SpamClassifier, TrainingSummary};
use crate::tracking::{ExperimentTracker, RunStatus, log_quietly, metrics_map};

/// What a training run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub kind: ModelKind,
    pub model_name: String,
    pub summary: TrainingSummary,
    pub test_metrics: ClassificationMetrics,
    pub achieves_target: bool,
    pub artifact: PathBuf,
    /// Tracking run id, when tracking succeeded in opening a run.
    pub run_id: Option<String>,
}

/// Train the model of `kind` on `split.train`, evaluate it on `split.test`
/// and save the artifact into `config.paths.models_dir`.
///
/// Tracking failures are logged and never fail the training.
pub fn train_and_save(
    kind: ModelKind,
    config: &AppConfig,
    split: &DatasetSplit,
    tracker: &mut dyn ExperimentTracker,
) -> Result<TrainingOutcome> {
    let mut classifier = kind.build(config)?;

    let run_id = match tracker.start_run(&format!("{kind}_model")) {
        Ok(run_id) if !run_id.is_empty() => Some(run_id),
        Ok(_) => None,
        Err(e) => {
            warn!("Could not start tracking run for {kind}: {e}");
            None
        }
    };
    let tracking = run_id.is_some();

    if tracking {
        let mut params = classifier.hyperparameters();
        params.insert("model_type".to_string(), kind.as_str().to_string());
        params.insert("train_samples".to_string(), split.train.len().to_string());
        params.insert("test_samples".to_string(), split.test.len().to_string());
        log_quietly(tracker, "log params", |t| t.log_params(&params));
    }

    let (summary, test_metrics) = match fit_evaluate_save(classifier.as_mut(), config, split) {
        Ok(trained) => trained,
        Err(e) => {
            if tracking {
                log_quietly(tracker, "end run", |t| t.end_run(RunStatus::Failed));
            }
            return Err(e);
        }
    };

    if tracking {
        let mut metrics = metrics_map("test", &test_metrics);
        metrics.insert("train_f1_score".to_string(), summary.train_f1);
        metrics.insert(
            "training_time_ms".to_string(),
            summary.training_time_ms as f64,
        );
        log_quietly(tracker, "log metrics", |t| t.log_metrics(&metrics));
        log_quietly(tracker, "end run", |t| t.end_run(RunStatus::Finished));
    }

    let target = config.evaluation.target_f1_score;
    let achieves_target = test_metrics.f1 >= target;
    info!(
        "{} test F1 {:.4} {} target {:.2}",
        classifier.name(),
        test_metrics.f1,
        if achieves_target { "meets" } else { "misses" },
        target
    );

    Ok(TrainingOutcome {
        kind,
        model_name: classifier.name().to_string(),
        summary,
        test_metrics,
        achieves_target,
        artifact: kind.artifact_path(&config.paths.models_dir),
        run_id,
    })
}

fn fit_evaluate_save(
    classifier: &mut dyn SpamClassifier,
    config: &AppConfig,
    split: &DatasetSplit,
) -> Result<(TrainingSummary, ClassificationMetrics)> {
    let summary = classifier.train(&split.train)?;
    let test_metrics = classifier.evaluate(&split.test)?;
    classifier.save(&config.paths.models_dir)?;
    Ok((summary, test_metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Label, LabeledMessage};
    use crate::ml::load_classifier;
    use crate::tracking::{FileTracker, NoopTracker};
    use tempfile::TempDir;

    fn split() -> DatasetSplit {
        let spam = [
            "free prize claim now",
            "win cash free entry today",
            "urgent claim your prize now",
            "free ringtone text win",
        ];
        let ham = [
            "see you at lunch",
            "are we meeting tonight",
            "call me when you get home",
            "thanks for dinner yesterday",
        ];
        let mut train = Vec::new();
        for text in spam {
            train.push(LabeledMessage::new(text, Label::Spam));
        }
        for text in ham {
            train.push(LabeledMessage::new(text, Label::Ham));
        }
        let test = vec![
            LabeledMessage::new("claim your free prize", Label::Spam),
            LabeledMessage::new("see you tonight", Label::Ham),
        ];
        DatasetSplit { train, test }
    }

    fn config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.paths.models_dir = dir.path().join("models");
        config.tracking.dir = dir.path().join("mlruns");
        config
    }

    #[test]
    fn test_train_and_save_challenger() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mut tracker = FileTracker::new(&config.tracking.dir, "exp");

        let outcome =
            train_and_save(ModelKind::Challenger, &config, &split(), &mut tracker).unwrap();

        assert_eq!(outcome.test_metrics.total(), 2);
        assert!(outcome.artifact.exists());
        let run_id = outcome.run_id.unwrap();
        let meta = tracker.read_meta(&run_id).unwrap();
        assert_eq!(meta.status, RunStatus::Finished);

        // The saved artifact loads back.
        let loaded = load_classifier(ModelKind::Challenger, &config).unwrap();
        assert!(loaded.is_trained());
    }

    #[test]
    fn test_train_without_tracking() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let outcome =
            train_and_save(ModelKind::Baseline, &config, &split(), &mut NoopTracker).unwrap();
        assert!(outcome.run_id.is_none());
        assert_eq!(outcome.model_name, "TF-IDF + Logistic Regression");
        assert!(!dir.path().join("mlruns").exists());
    }

    #[test]
    fn test_failed_training_marks_run_failed() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mut tracker = FileTracker::new(&config.tracking.dir, "exp");
        let empty = DatasetSplit {
            train: Vec::new(),
            test: Vec::new(),
        };

        assert!(train_and_save(ModelKind::Challenger, &config, &empty, &mut tracker).is_err());
        // The failed run was closed, so a new one can start.
        assert!(tracker.start_run("next").is_ok());
    }
}
