//! # SMS Spam Detector
//!
//! Trains two SMS spam classifiers, compares them on a held-out test set
//! against an F1 target and serves predictions.
//!
//! ## Features
//!
//! - Deterministic stratified train/test split of the SMS Spam Collection
//! - Text analysis pipeline (normalization, stop words, n-grams)
//! - TF-IDF + logistic regression baseline and naive Bayes challenger
//! - Classification metrics, model comparison and an atomically written
//!   result document
//! - File-based experiment tracking
//! - HTTP prediction service

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod ml;
pub mod serving;
pub mod tracking;
pub mod util;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
