//! Multinomial naive Bayes challenger.
//!
//! Each message is reduced to n-gram counts by the SMS analyzer. Class
//! conditional term probabilities use additive smoothing:
//!
//! ```text
//! P(term | class) = (count(term, class) + alpha) / (total(class) + alpha * |V|)
//! ```
//!
//! Class probabilities come from a softmax over the log posteriors, which
//! keeps long messages from underflowing.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use chrono::Utc;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::config::ChallengerConfig;
use crate::dataset::{Label, LabeledMessage};
use crate::error::{Result, SpamError};
use crate::evaluation::metrics::compute;
use crate::ml::classifier::{
    ModelKind, ModelMetadata, Prediction, SpamClassifier, TrainingSummary, read_artifact,
    untrained, write_artifact,
};

pub(crate) const MODEL_NAME: &str = "Multinomial Naive Bayes";

/// Fitted parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NaiveBayesParams {
    terms: Vec<String>,
    class_log_prior: [f64; 2],
    /// `feature_log_prob[class][term]`.
    feature_log_prob: [Vec<f64>; 2],
}

#[derive(Debug, Serialize, Deserialize)]
struct NaiveBayesArtifact {
    metadata: ModelMetadata,
    config: ChallengerConfig,
    params: NaiveBayesParams,
}

struct Fitted {
    vocabulary: AHashMap<String, usize>,
    params: NaiveBayesParams,
    metadata: ModelMetadata,
}

impl Fitted {
    fn new(params: NaiveBayesParams, metadata: ModelMetadata) -> Self {
        let vocabulary = params
            .terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Self {
            vocabulary,
            params,
            metadata,
        }
    }

    fn spam_probability(&self, terms: &[String]) -> f64 {
        let mut joint = self.params.class_log_prior;
        for term in terms {
            if let Some(&j) = self.vocabulary.get(term) {
                for (c, log_prob) in self.params.feature_log_prob.iter().enumerate() {
                    joint[c] += log_prob[j];
                }
            }
        }

        // Two-class softmax.
        let max = joint[0].max(joint[1]);
        let ham = (joint[0] - max).exp();
        let spam = (joint[1] - max).exp();
        spam / (ham + spam)
    }
}

/// The challenger spam classifier.
pub struct NaiveBayesModel {
    config: ChallengerConfig,
    analyzer: Arc<PipelineAnalyzer>,
    fitted: Option<Fitted>,
}

impl std::fmt::Debug for NaiveBayesModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NaiveBayesModel")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer.name())
            .field("trained", &self.fitted.is_some())
            .finish()
    }
}

impl NaiveBayesModel {
    pub fn new(config: ChallengerConfig) -> Result<Self> {
        let analyzer = Arc::new(PipelineAnalyzer::sms(config.ngram_range, config.stop_words)?);
        Ok(Self {
            config,
            analyzer,
            fitted: None,
        })
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.fitted.as_ref().map(|f| &f.metadata)
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted
            .as_ref()
            .ok_or_else(|| untrained(ModelKind::Challenger))
    }

    fn fit_params(
        &self,
        documents: &[Vec<String>],
        labels: &[Label],
    ) -> Result<NaiveBayesParams> {
        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in documents {
            for term in terms {
                index.entry(term.as_str()).or_insert(0);
            }
        }
        if index.is_empty() {
            return Err(SpamError::data("no terms in training messages"));
        }
        for (i, slot) in index.values_mut().enumerate() {
            *slot = i;
        }

        let n_terms = index.len();
        let mut counts = [vec![0.0; n_terms], vec![0.0; n_terms]];
        let mut class_docs = [0usize; 2];

        for (terms, label) in documents.iter().zip(labels) {
            let c = label.index();
            class_docs[c] += 1;
            for term in terms {
                counts[c][index[term.as_str()]] += 1.0;
            }
        }

        let n_docs = labels.len() as f64;
        let alpha = self.config.alpha;
        let class_log_prior = class_docs.map(|count| (count as f64 / n_docs).ln());
        let feature_log_prob = counts.map(|row| {
            let denominator = (row.iter().sum::<f64>() + alpha * n_terms as f64).ln();
            row.into_iter()
                .map(|count| (count + alpha).ln() - denominator)
                .collect::<Vec<f64>>()
        });

        Ok(NaiveBayesParams {
            terms: index.into_keys().map(str::to_string).collect(),
            class_log_prior,
            feature_log_prob,
        })
    }
}

impl SpamClassifier for NaiveBayesModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Challenger
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
            ("model_type".to_string(), ModelKind::Challenger.to_string()),
            ("algorithm".to_string(), MODEL_NAME.to_string()),
            ("alpha".to_string(), c.alpha.to_string()),
            (
                "ngram_range".to_string(),
                format!("({}, {})", c.ngram_range.0, c.ngram_range.1),
            ),
            ("stop_words".to_string(), c.stop_words.to_string()),
        ])
    }

    fn train(&mut self, messages: &[LabeledMessage]) -> Result<TrainingSummary> {
        if messages.is_empty() {
            return Err(SpamError::empty_dataset("no training messages"));
        }
        let labels: Vec<Label> = messages.iter().map(|m| m.label).collect();
        if labels.iter().all(|&l| l == labels[0]) {
            return Err(SpamError::empty_dataset(
                "naive Bayes needs messages of both labels",
            ));
        }

        let start = Instant::now();
        info!("Training {MODEL_NAME} on {} messages", messages.len());

        let documents = messages
            .iter()
            .map(|m| self.analyzer.terms(&m.text))
            .collect::<Result<Vec<_>>>()?;
        let params = self.fit_params(&documents, &labels)?;
        let n_features = params.terms.len();

        let metadata = ModelMetadata {
            kind: ModelKind::Challenger,
            name: MODEL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            training_examples: messages.len(),
            hyperparameters: self.hyperparameters(),
            train_f1: 0.0,
        };
        let mut fitted = Fitted::new(params, metadata);

        let predicted: Vec<Label> = documents
            .iter()
            .map(|terms| Prediction::from_spam_probability(fitted.spam_probability(terms)).label)
            .collect();
        let train_f1 = compute(&labels, &predicted)?.f1;
        fitted.metadata.train_f1 = train_f1;
        self.fitted = Some(fitted);

        let summary = TrainingSummary {
            train_f1,
            n_samples: messages.len(),
            n_features,
            training_time_ms: start.elapsed().as_millis() as u64,
        };
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
                let terms = self.analyzer.terms(text)?;
                Ok(Prediction::from_spam_probability(
                    fitted.spam_probability(&terms),
                ))
            })
            .collect()
    }

    fn save(&self, models_dir: &Path) -> Result<()> {
        let fitted = self.fitted()?;
        let artifact = NaiveBayesArtifact {
            metadata: fitted.metadata.clone(),
            config: self.config.clone(),
            params: fitted.params.clone(),
        };
        write_artifact(ModelKind::Challenger, models_dir, &artifact)
    }

    fn load(&mut self, models_dir: &Path) -> Result<()> {
        let artifact: NaiveBayesArtifact = read_artifact(ModelKind::Challenger, models_dir)?;
        let params = &artifact.params;
        if params
            .feature_log_prob
            .iter()
            .any(|row| row.len() != params.terms.len())
        {
            return Err(SpamError::corrupt(
                "challenger artifact has mismatched term probabilities",
            ));
        }

        self.analyzer = Arc::new(PipelineAnalyzer::sms(
            artifact.config.ngram_range,
            artifact.config.stop_words,
        )?);
        self.config = artifact.config;
        self.fitted = Some(Fitted::new(artifact.params, artifact.metadata));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn messages() -> Vec<LabeledMessage> {
        vec![
            LabeledMessage::new("see you at lunch", Label::Ham),
            LabeledMessage::new("call me when you get home", Label::Ham),
            LabeledMessage::new("are you coming to dinner", Label::Ham),
            LabeledMessage::new("win free cash now", Label::Spam),
            LabeledMessage::new("free prize claim now", Label::Spam),
        ]
    }

    #[test]
    fn test_train_and_predict() {
        let mut model = NaiveBayesModel::new(ChallengerConfig::default()).unwrap();
        let summary = model.train(&messages()).unwrap();
        assert_eq!(summary.n_samples, 5);
        assert_relative_eq!(summary.train_f1, 1.0);

        let predictions = model.predict(&["free cash prize", "see you at home"]).unwrap();
        assert_eq!(predictions[0].label, Label::Spam);
        assert_eq!(predictions[1].label, Label::Ham);
    }

    #[test]
    fn test_unknown_terms_fall_back_to_prior() {
        let mut model = NaiveBayesModel::new(ChallengerConfig::default()).unwrap();
        model.train(&messages()).unwrap();

        let p = model.predict(&["zzz qqq"]).unwrap()[0];
        assert_relative_eq!(p.spam_probability(), 0.4, epsilon = 1e-12);
        assert_eq!(p.label, Label::Ham);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let mut model = NaiveBayesModel::new(ChallengerConfig::default()).unwrap();
        model.train(&messages()).unwrap();

        let long_message = "free ".repeat(2000);
        let p = model.predict(&[long_message.as_str()]).unwrap()[0];
        assert!(p.spam_probability().is_finite());
        assert_relative_eq!(p.ham_probability() + p.spam_probability(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_label_training_is_rejected() {
        let mut model = NaiveBayesModel::new(ChallengerConfig::default()).unwrap();
        let only_ham = vec![LabeledMessage::new("hello", Label::Ham)];
        assert!(matches!(model.train(&only_ham), Err(SpamError::EmptyDataset(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut model = NaiveBayesModel::new(ChallengerConfig::default()).unwrap();
        model.train(&messages()).unwrap();
        model.save(dir.path()).unwrap();

        let mut restored = NaiveBayesModel::new(ChallengerConfig::default()).unwrap();
        assert!(!restored.is_trained());
        restored.load(dir.path()).unwrap();

        let texts = ["win cash", "dinner at home"];
        assert_eq!(model.predict(&texts).unwrap(), restored.predict(&texts).unwrap());
        assert_relative_eq!(restored.metadata().unwrap().train_f1, 1.0);
    }
}
