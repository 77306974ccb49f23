//! Spam classifiers.
//!
//! Both models implement the [`SpamClassifier`] capability and are selected
//! through [`ModelKind`]:
//!
//! - [`ModelKind::Baseline`]: TF-IDF features and L2-regularized logistic
//!   regression ([`baseline::BaselineModel`]).
//! - [`ModelKind::Challenger`]: multinomial naive Bayes over n-gram counts
//!   ([`naive_bayes::NaiveBayesModel`]).
//!
//! [`training::train_and_save`] runs the fit, test-set scoring, artifact
//! write and experiment tracking for one model.

pub mod baseline;
pub mod classifier;
pub mod logistic;
pub mod naive_bayes;
pub mod tfidf;
pub mod training;

pub use classifier::{
    ModelKind, ModelMetadata, Prediction, SpamClassifier, TrainingSummary, load_classifier,
};
pub use training::{TrainingOutcome, train_and_save};
