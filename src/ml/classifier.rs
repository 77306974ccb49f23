//! The classifier capability shared by the baseline and the challenger.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::dataset::{Label, LabeledMessage};
use crate::error::{Result, SpamError};
use crate::evaluation::metrics::{ClassificationMetrics, compute};
use crate::ml::baseline::BaselineModel;
use crate::ml::naive_bayes::NaiveBayesModel;
use crate::util::fs::write_json_atomic;

/// Which of the two compared models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Baseline,
    Challenger,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Baseline, ModelKind::Challenger];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Baseline => "baseline",
            ModelKind::Challenger => "challenger",
        }
    }

    /// Human-readable name of the algorithm behind this slot.
    pub fn algorithm(self) -> &'static str {
        match self {
            ModelKind::Baseline => crate::ml::baseline::MODEL_NAME,
            ModelKind::Challenger => crate::ml::naive_bayes::MODEL_NAME,
        }
    }

    /// File name of the trained artifact inside `models_dir`.
    pub fn artifact_file_name(self) -> &'static str {
        match self {
            ModelKind::Baseline => "baseline_model.json",
            ModelKind::Challenger => "challenger_model.json",
        }
    }

    pub fn artifact_path(self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.artifact_file_name())
    }

    /// Construct an untrained classifier of this kind from configuration.
    pub fn build(self, config: &AppConfig) -> Result<Box<dyn SpamClassifier>> {
        Ok(match self {
            ModelKind::Baseline => Box::new(BaselineModel::new(config.baseline.clone())?),
            ModelKind::Challenger => Box::new(NaiveBayesModel::new(config.challenger.clone())?),
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = SpamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(ModelKind::Baseline),
            // Legacy name of the challenger slot in older result documents.
            "challenger" | "distilbert" => Ok(ModelKind::Challenger),
            other => Err(SpamError::model_unavailable(format!(
                "unknown model type '{other}'"
            ))),
        }
    }
}

/// Label and class probabilities for one message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// `[p_ham, p_spam]`.
    pub probabilities: [f64; 2],
}

impl Prediction {
    /// Build a prediction from the spam probability. SPAM wins only when it
    /// is strictly more likely than HAM.
    pub fn from_spam_probability(p_spam: f64) -> Self {
        let p_spam = p_spam.clamp(0.0, 1.0);
        Prediction {
            label: if p_spam > 0.5 { Label::Spam } else { Label::Ham },
            probabilities: [1.0 - p_spam, p_spam],
        }
    }

    pub fn ham_probability(&self) -> f64 {
        self.probabilities[Label::Ham.index()]
    }

    pub fn spam_probability(&self) -> f64 {
        self.probabilities[Label::Spam.index()]
    }

    /// Probability of the predicted label.
    pub fn confidence(&self) -> f64 {
        self.probabilities[self.label.index()]
    }
}

/// What training reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Support-weighted F1 on the training set.
    pub train_f1: f64,
    pub n_samples: usize,
    pub n_features: usize,
    pub training_time_ms: u64,
}

/// Metadata stored next to the parameters of every trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub kind: ModelKind,
    pub name: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub training_examples: usize,
    pub hyperparameters: BTreeMap<String, String>,
    pub train_f1: f64,
}

/// Capability implemented by every spam classifier.
pub trait SpamClassifier: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Human-readable algorithm name.
    fn name(&self) -> &str;

    fn is_trained(&self) -> bool;

    /// Hyperparameters as strings, for experiment tracking.
    fn hyperparameters(&self) -> BTreeMap<String, String>;

    /// Fit the model on labeled messages.
    fn train(&mut self, messages: &[LabeledMessage]) -> Result<TrainingSummary>;

    /// Predict a batch of messages. Output order matches input order.
    ///
    /// # Errors
    ///
    /// [`SpamError::ModelUnavailable`] if the model has not been trained or
    /// loaded.
    fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>>;

    /// Predict every message and score the predictions.
    fn evaluate(&self, messages: &[LabeledMessage]) -> Result<ClassificationMetrics> {
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        let y_true: Vec<Label> = messages.iter().map(|m| m.label).collect();
        let y_pred: Vec<Label> = self.predict(&texts)?.iter().map(|p| p.label).collect();

        let metrics = compute(&y_true, &y_pred)?;
        info!(
            "{} evaluated on {} messages: f1={:.4}, accuracy={:.4}",
            self.name(),
            messages.len(),
            metrics.f1,
            metrics.accuracy
        );
        Ok(metrics)
    }

    /// Write the trained model into `models_dir`.
    fn save(&self, models_dir: &Path) -> Result<()>;

    /// Replace this model's state with the artifact in `models_dir`.
    fn load(&mut self, models_dir: &Path) -> Result<()>;
}

/// Build a classifier of `kind` and load its trained artifact.
pub fn load_classifier(kind: ModelKind, config: &AppConfig) -> Result<Box<dyn SpamClassifier>> {
    let mut classifier = kind.build(config)?;
    classifier.load(&config.paths.models_dir)?;
    Ok(classifier)
}

pub(crate) fn untrained(kind: ModelKind) -> SpamError {
    SpamError::model_unavailable(format!("{kind} model has not been trained or loaded"))
}

pub(crate) fn write_artifact<T: Serialize>(
    kind: ModelKind,
    models_dir: &Path,
    artifact: &T,
) -> Result<()> {
    let path = kind.artifact_path(models_dir);
    write_json_atomic(&path, artifact)?;
    info!("Saved {kind} model to {}", path.display());
    Ok(())
}

pub(crate) fn read_artifact<T: DeserializeOwned>(kind: ModelKind, models_dir: &Path) -> Result<T> {
    let path = kind.artifact_path(models_dir);
    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SpamError::model_unavailable(format!(
                "no trained {kind} model at {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let artifact = serde_json::from_str(&json)
        .map_err(|e| SpamError::corrupt(format!("{}: {e}", path.display())))?;
    info!("Loaded {kind} model from {}", path.display());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("baseline".parse::<ModelKind>().unwrap(), ModelKind::Baseline);
        assert_eq!("Challenger".parse::<ModelKind>().unwrap(), ModelKind::Challenger);
        assert_eq!("distilbert".parse::<ModelKind>().unwrap(), ModelKind::Challenger);

        let err = "gpt".parse::<ModelKind>().unwrap_err();
        assert!(matches!(err, SpamError::ModelUnavailable(_)));
    }

    #[test]
    fn test_prediction_from_probability() {
        let p = Prediction::from_spam_probability(0.8);
        assert_eq!(p.label, Label::Spam);
        assert_eq!(p.confidence(), 0.8);
        assert!((p.ham_probability() + p.spam_probability() - 1.0).abs() < 1e-12);

        // An exact tie is HAM.
        let p = Prediction::from_spam_probability(0.5);
        assert_eq!(p.label, Label::Ham);
        assert_eq!(p.confidence(), 0.5);
    }

    #[test]
    fn test_load_classifier_without_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.paths.models_dir = dir.path().to_path_buf();

        for kind in ModelKind::ALL {
            let err = load_classifier(kind, &config).err().unwrap();
            assert!(matches!(err, SpamError::ModelUnavailable(_)));
        }
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.paths.models_dir = dir.path().to_path_buf();
        std::fs::write(ModelKind::Baseline.artifact_path(dir.path()), "{}").unwrap();

        let err = load_classifier(ModelKind::Baseline, &config).err().unwrap();
        assert!(matches!(err, SpamError::CorruptDocument(_)));
    }
}
