//! TF-IDF + logistic regression baseline.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::config::BaselineConfig;
use crate::dataset::{Label, LabeledMessage};
use crate::error::{Result, SpamError};
use crate::evaluation::metrics::compute;
use crate::ml::classifier::{
    ModelKind, ModelMetadata, Prediction, SpamClassifier, TrainingSummary, read_artifact,
    untrained, write_artifact,
};
use crate::ml::logistic::LogisticRegression;
use crate::ml::tfidf::{TfIdfParams, TfIdfState, TfIdfVectorizer};

pub(crate) const MODEL_NAME: &str = "TF-IDF + Logistic Regression";

/// On-disk form of a trained baseline.
#[derive(Debug, Serialize, Deserialize)]
struct BaselineArtifact {
    metadata: ModelMetadata,
    config: BaselineConfig,
    vectorizer: TfIdfState,
    classifier: LogisticRegression,
}

struct Fitted {
    vectorizer: TfIdfVectorizer,
    classifier: LogisticRegression,
    metadata: ModelMetadata,
}

/// The baseline spam classifier.
pub struct BaselineModel {
    config: BaselineConfig,
    fitted: Option<Fitted>,
}

impl std::fmt::Debug for BaselineModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaselineModel")
            .field("config", &self.config)
            .field("trained", &self.fitted.is_some())
            .finish()
    }
}

impl BaselineModel {
    pub fn new(config: BaselineConfig) -> Result<Self> {
        // Surface a bad n-gram range at construction, not at training time.
        analyzer_for(&config)?;
        Ok(Self {
            config,
            fitted: None,
        })
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.fitted.as_ref().map(|f| &f.metadata)
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted.as_ref().ok_or_else(|| untrained(ModelKind::Baseline))
    }
}

fn analyzer_for(config: &BaselineConfig) -> Result<Arc<PipelineAnalyzer>> {
    Ok(Arc::new(PipelineAnalyzer::sms(
        config.ngram_range,
        config.stop_words,
    )?))
}

fn params_for(config: &BaselineConfig) -> TfIdfParams {
    TfIdfParams {
        max_features: config.max_features,
        min_df: config.min_df,
        max_df: config.max_df,
    }
}

impl SpamClassifier for BaselineModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Baseline
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        let c = &self.config;
        BTreeMap::from([
            ("model_type".to_string(), ModelKind::Baseline.to_string()),
            ("algorithm".to_string(), MODEL_NAME.to_string()),
            ("max_features".to_string(), c.max_features.to_string()),
            (
                "ngram_range".to_string(),
                format!("({}, {})", c.ngram_range.0, c.ngram_range.1),
            ),
            ("C".to_string(), c.c.to_string()),
            ("max_iter".to_string(), c.max_iter.to_string()),
            ("learning_rate".to_string(), c.learning_rate.to_string()),
            ("stop_words".to_string(), c.stop_words.to_string()),
        ])
    }

    fn train(&mut self, messages: &[LabeledMessage]) -> Result<TrainingSummary> {
        if messages.is_empty() {
            return Err(SpamError::empty_dataset("no training messages"));
        }

        let start = Instant::now();
        info!("Training {MODEL_NAME} on {} messages", messages.len());

        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        let labels: Vec<Label> = messages.iter().map(|m| m.label).collect();

        let mut vectorizer =
            TfIdfVectorizer::new(analyzer_for(&self.config)?, params_for(&self.config));
        let features = vectorizer.fit_transform(&texts)?;

        let mut classifier = LogisticRegression::new(
            self.config.c,
            self.config.max_iter,
            self.config.learning_rate,
            self.config.tol,
        );
        classifier.fit(&features, &labels, vectorizer.vocabulary_size())?;

        let predicted: Vec<Label> = features
            .iter()
            .map(|row| Prediction::from_spam_probability(classifier.predict_proba(row)).label)
            .collect();
        let train_f1 = compute(&labels, &predicted)?.f1;

        let summary = TrainingSummary {
            train_f1,
            n_samples: messages.len(),
            n_features: vectorizer.vocabulary_size(),
            training_time_ms: start.elapsed().as_millis() as u64,
        };

        let metadata = ModelMetadata {
            kind: ModelKind::Baseline,
            name: MODEL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            training_examples: messages.len(),
            hyperparameters: self.hyperparameters(),
            train_f1,
        };

        self.fitted = Some(Fitted {
            vectorizer,
            classifier,
            metadata,
        });

        info!(
            "Trained {MODEL_NAME}: train_f1={:.4}, features={}",
            summary.train_f1, summary.n_features
        );
        Ok(summary)
    }

    fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        let fitted = self.fitted()?;
        texts
            .par_iter()
            .map(|text| {
                let row = fitted.vectorizer.transform(text)?;
                Ok(Prediction::from_spam_probability(
                    fitted.classifier.predict_proba(&row),
                ))
            })
            .collect()
    }

    fn save(&self, models_dir: &Path) -> Result<()> {
        let fitted = self.fitted()?;
        let artifact = BaselineArtifact {
            metadata: fitted.metadata.clone(),
            config: self.config.clone(),
            vectorizer: fitted.vectorizer.state().clone(),
            classifier: fitted.classifier.clone(),
        };
        write_artifact(ModelKind::Baseline, models_dir, &artifact)
    }

    fn load(&mut self, models_dir: &Path) -> Result<()> {
        let artifact: BaselineArtifact = read_artifact(ModelKind::Baseline, models_dir)?;

        if artifact.classifier.n_features() != artifact.vectorizer.terms.len() {
            return Err(SpamError::corrupt(format!(
                "baseline artifact has {} weights for {} terms",
                artifact.classifier.n_features(),
                artifact.vectorizer.terms.len()
            )));
        }

        // The analyzer must match the one the model was trained with.
        let vectorizer = TfIdfVectorizer::from_state(
            analyzer_for(&artifact.config)?,
            params_for(&artifact.config),
            artifact.vectorizer,
        )?;

        self.config = artifact.config;
        self.fitted = Some(Fitted {
            vectorizer,
            classifier: artifact.classifier,
            metadata: artifact.metadata,
        });
        Ok(())
    }
}
