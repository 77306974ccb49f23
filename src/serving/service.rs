//! Prediction and model-status service over the trained classifiers.
//!
//! Classifiers live in a registry guarded by a `parking_lot::RwLock`. A
//! request clones the `Arc` of its model and releases the lock before
//! running inference, and a reload swaps the `Arc` in one write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::Result;
use crate::evaluation::store::{ResultDocument, load_document};
use crate::ml::{ModelKind, SpamClassifier, load_classifier};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub message: String,
    /// `baseline` or `challenger`. Empty selects the baseline.
    #[serde(default)]
    pub model_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub is_spam: bool,
    /// Probability of the predicted class.
    pub confidence: f64,
    pub spam_probability: f64,
    pub ham_probability: f64,
    pub model_used: String,
    /// Empty on success.
    pub error_message: String,
}

impl PredictResponse {
    fn error<S: Into<String>>(message: S) -> Self {
        PredictResponse {
            error_message: message.into(),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatusRequest {
    #[serde(default)]
    pub model_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatusResponse {
    pub is_loaded: bool,
    pub model_name: String,
    /// F1 from the stored comparison document, `0.0` when unavailable.
    pub f1_score: f64,
    pub checked_at: String,
    pub error_message: String,
}

fn resolve_kind(model_type: &str) -> Result<ModelKind> {
    if model_type.trim().is_empty() {
        Ok(ModelKind::Baseline)
    } else {
        model_type.parse()
    }
}

/// Shared state of the prediction service.
pub struct ServingState {
    config: AppConfig,
    models: RwLock<HashMap<ModelKind, Arc<dyn SpamClassifier>>>,
}

impl ServingState {
    /// A service with no models loaded.
    pub fn new(config: AppConfig) -> Self {
        ServingState {
            config,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// A service with every trained model that can be loaded.
    ///
    /// Models that fail to load are skipped with a warning.
    pub fn load(config: AppConfig) -> Self {
        let state = ServingState::new(config);
        for kind in ModelKind::ALL {
            if let Err(e) = state.reload(kind) {
                warn!("Could not load {kind} model: {e}");
            }
        }
        state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn results_path(&self) -> PathBuf {
        self.config.paths.results_file()
    }

    /// Register a trained classifier under its own kind.
    pub fn insert(&self, classifier: Arc<dyn SpamClassifier>) {
        let kind = classifier.kind();
        self.models.write().insert(kind, classifier);
        info!("Registered {kind} model for serving");
    }

    pub fn model(&self, kind: ModelKind) -> Option<Arc<dyn SpamClassifier>> {
        self.models.read().get(&kind).cloned()
    }

    pub fn loaded_models(&self) -> Vec<ModelKind> {
        let mut kinds: Vec<ModelKind> = self.models.read().keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Load the artifact of `kind` from disk and swap it in.
    ///
    /// On failure the previously loaded model, if any, keeps serving.
    pub fn reload(&self, kind: ModelKind) -> Result<()> {
        let classifier = load_classifier(kind, &self.config)?;
        self.insert(Arc::from(classifier));
        Ok(())
    }

    /// Classify one message.
    pub fn predict(&self, request: &PredictRequest) -> PredictResponse {
        let kind = match resolve_kind(&request.model_type) {
            Ok(kind) => kind,
            Err(e) => return PredictResponse::error(e.to_string()),
        };

        let Some(model) = self.model(kind) else {
            return PredictResponse::error(format!("Model '{kind}' is not available"));
        };

        let prediction = match model.predict(&[request.message.as_str()]) {
            Ok(predictions) => match predictions.into_iter().next() {
                Some(prediction) => prediction,
                None => return PredictResponse::error("Model returned no prediction"),
            },
            Err(e) => {
                error!("Prediction with {kind} model failed: {e}");
                return PredictResponse::error(format!("Internal error: {e}"));
            }
        };

        debug!(
            "{kind} predicted {} (p_spam={:.4})",
            prediction.label,
            prediction.spam_probability()
        );
        PredictResponse {
            is_spam: prediction.label.is_spam(),
            confidence: prediction.confidence(),
            spam_probability: prediction.spam_probability(),
            ham_probability: prediction.ham_probability(),
            model_used: model.name().to_string(),
            error_message: String::new(),
        }
    }

    /// Report whether a model is loaded and its last evaluated F1.
    pub fn model_status(&self, request: &ModelStatusRequest) -> ModelStatusResponse {
        let checked_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let kind = match resolve_kind(&request.model_type) {
            Ok(kind) => kind,
            Err(e) => {
                return ModelStatusResponse {
                    checked_at,
                    error_message: e.to_string(),
                    ..Default::default()
                };
            }
        };

        let model = self.model(kind);
        let model_name = model
            .as_ref()
            .map_or_else(|| kind.algorithm().to_string(), |m| m.name().to_string());

        let f1_score = match self.comparison() {
            Ok(document) => match kind {
                ModelKind::Baseline => document.baseline_metrics.f1,
                ModelKind::Challenger => document.challenger_metrics.f1,
            },
            Err(e) => {
                debug!("No stored F1 for {kind}: {e}");
                0.0
            }
        };

        ModelStatusResponse {
            is_loaded: model.is_some(),
            model_name,
            f1_score,
            checked_at,
            error_message: String::new(),
        }
    }

    /// The stored comparison document.
    pub fn comparison(&self) -> Result<ResultDocument> {
        load_document(self.results_path())
    }
}

impl std::fmt::Debug for ServingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServingState")
            .field("loaded_models", &self.loaded_models())
            .field("results_path", &self.results_path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpamError;
    use crate::dataset::{Label, LabeledMessage};
    use crate::ml::naive_bayes::NaiveBayesModel;
    use tempfile::TempDir;

    fn corpus() -> Vec<LabeledMessage> {
        vec![
            LabeledMessage::new("free prize claim now", Label::Spam),
            LabeledMessage::new("win cash free entry", Label::Spam),
            LabeledMessage::new("urgent claim your prize", Label::Spam),
            LabeledMessage::new("see you at lunch", Label::Ham),
            LabeledMessage::new("are we meeting tonight", Label::Ham),
            LabeledMessage::new("call me when you get home", Label::Ham),
        ]
    }

    fn state_with_challenger(dir: &TempDir) -> ServingState {
        let mut config = AppConfig::default();
        config.paths.models_dir = dir.path().join("models");
        config.paths.results_dir = dir.path().join("results");

        let mut model = NaiveBayesModel::new(config.challenger.clone()).unwrap();
        model.train(&corpus()).unwrap();

        let state = ServingState::new(config);
        state.insert(Arc::new(model));
        state
    }

    #[test]
    fn test_predict_with_loaded_model() {
        let dir = TempDir::new().unwrap();
        let state = state_with_challenger(&dir);

        let response = state.predict(&PredictRequest {
            message: "claim your free prize".to_string(),
            model_type: "challenger".to_string(),
        });
        assert!(!response.is_error(), "{}", response.error_message);
        assert!(response.is_spam);
        assert_eq!(response.model_used, "Multinomial Naive Bayes");
        assert!((response.spam_probability + response.ham_probability - 1.0).abs() < 1e-9);
        assert_eq!(response.confidence, response.spam_probability);
    }

    #[test]
    fn test_predict_errors_are_responses() {
        let dir = TempDir::new().unwrap();
        let state = state_with_challenger(&dir);

        // Empty model type selects the baseline, which is not loaded.
        let response = state.predict(&PredictRequest {
            message: "hello".to_string(),
            model_type: String::new(),
        });
        assert!(response.is_error());
        assert!(response.error_message.contains("baseline"));
        assert!(!response.is_spam);
        assert_eq!(response.confidence, 0.0);
        assert_eq!(response.spam_probability, 0.0);
        assert_eq!(response.ham_probability, 0.0);

        let response = state.predict(&PredictRequest {
            message: "hello".to_string(),
            model_type: "bert".to_string(),
        });
        assert!(response.is_error());
        assert!(response.model_used.is_empty());
    }

    #[test]
    fn test_model_status() {
        let dir = TempDir::new().unwrap();
        let state = state_with_challenger(&dir);

        let status = state.model_status(&ModelStatusRequest {
            model_type: "distilbert".to_string(),
        });
        assert!(status.is_loaded);
        assert_eq!(status.model_name, "Multinomial Naive Bayes");
        // No comparison document has been written yet.
        assert_eq!(status.f1_score, 0.0);
        assert!(status.error_message.is_empty());

        let status = state.model_status(&ModelStatusRequest::default());
        assert!(!status.is_loaded);
        assert_eq!(status.model_name, "TF-IDF + Logistic Regression");

        let status = state.model_status(&ModelStatusRequest {
            model_type: "unknown".to_string(),
        });
        assert!(!status.error_message.is_empty());
        assert!(!status.checked_at.is_empty());
    }

    #[test]
    fn test_reload_missing_artifact_keeps_registry() {
        let dir = TempDir::new().unwrap();
        let state = state_with_challenger(&dir);

        let err = state.reload(ModelKind::Challenger).unwrap_err();
        assert!(matches!(err, SpamError::ModelUnavailable(_)));
        assert_eq!(state.loaded_models(), vec![ModelKind::Challenger]);
    }
}
