//! Application configuration.
//!
//! Configuration is a YAML document with one section per concern. Every key
//! has a default, so an empty document (or no document at all) yields a usable
//! configuration.
//!
//! ```yaml
//! data:
//!   test_size: 0.2
//!   random_state: 42
//! evaluation:
//!   target_f1_score: 0.95
//! baseline:
//!   max_features: 5000
//!   ngram_range: [1, 2]
//!   C: 1.0
//! ```

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpamError};

/// Environment variable that points at the configuration file.
pub const CONFIG_ENV_VAR: &str = "SMS_SPAM_CONFIG";

/// File name of the persisted comparison document inside `results_dir`.
pub const RESULTS_FILE_NAME: &str = "evaluation_results.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub paths: PathsConfig,
    pub baseline: BaselineConfig,
    pub challenger: ChallengerConfig,
    pub evaluation: EvaluationConfig,
    pub tracking: TrackingConfig,
    pub serving: ServingConfig,
}

/// Dataset location and split parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Where the raw corpus can be obtained. Only used in error messages.
    pub dataset_url: String,
    /// Tab-separated raw corpus (`label<TAB>message`).
    pub data_path: PathBuf,
    /// Fraction of messages held out for testing.
    pub test_size: f64,
    /// Seed of the stratified split.
    pub random_state: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_url:
                "https://archive.ics.uci.edu/ml/machine-learning-databases/00228/smsspamcollection.zip"
                    .to_string(),
            data_path: PathBuf::from("data/SMSSpamCollection"),
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Output directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            models_dir: PathBuf::from("models"),
            results_dir: PathBuf::from("results"),
        }
    }
}

impl PathsConfig {
    /// Location of the persisted comparison document.
    pub fn results_file(&self) -> PathBuf {
        self.results_dir.join(RESULTS_FILE_NAME)
    }
}

/// A document-frequency bound, either an absolute count or a proportion of
/// the corpus.
///
/// YAML integers (`2`) are counts and YAML floats (`0.95`) are proportions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocFrequency {
    Count(usize),
    Proportion(f64),
}

impl DocFrequency {
    /// Resolve the bound to a document count for a corpus of `n_documents`.
    pub fn resolve(&self, n_documents: usize) -> f64 {
        match self {
            DocFrequency::Count(count) => *count as f64,
            DocFrequency::Proportion(p) => p * n_documents as f64,
        }
    }
}

/// TF-IDF + logistic regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub max_features: usize,
    pub ngram_range: (usize, usize),
    pub min_df: DocFrequency,
    pub max_df: DocFrequency,
    /// Inverse regularization strength.
    #[serde(rename = "C")]
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub tol: f64,
    pub stop_words: bool,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            ngram_range: (1, 2),
            min_df: DocFrequency::Count(1),
            max_df: DocFrequency::Proportion(0.95),
            c: 1.0,
            max_iter: 1000,
            learning_rate: 1.0,
            tol: 1e-6,
            stop_words: true,
        }
    }
}

/// Naive Bayes challenger hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengerConfig {
    /// Additive smoothing.
    pub alpha: f64,
    pub ngram_range: (usize, usize),
    pub stop_words: bool,
}

impl Default for ChallengerConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            ngram_range: (1, 1),
            stop_words: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub target_f1_score: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            target_f1_score: 0.95,
        }
    }
}

/// File-based experiment tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub experiment_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("mlruns"),
            experiment_name: "SMS_Spam_Detection".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let yaml = std::fs::read_to_string(path).map_err(|e| {
            SpamError::configuration(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_yaml_str(&yaml)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        let config: AppConfig = if yaml.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| SpamError::configuration(format!("failed to parse YAML: {e}")))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by [`CONFIG_ENV_VAR`], or use defaults.
    pub fn load_from_env_and_defaults() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load(path),
            Err(_) => {
                debug!("{CONFIG_ENV_VAR} not set, using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Resolve configuration for the CLI: an explicit path wins over the
    /// environment, which wins over defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_from_env_and_defaults(),
        }
    }

    /// Reject values that would make training or evaluation meaningless.
    pub fn validate(&self) -> Result<()> {
        let test_size = self.data.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(SpamError::configuration(format!(
                "data.test_size must be in (0, 1), got {test_size}"
            )));
        }

        let target = self.evaluation.target_f1_score;
        if !(0.0..=1.0).contains(&target) {
            return Err(SpamError::configuration(format!(
                "evaluation.target_f1_score must be in [0, 1], got {target}"
            )));
        }

        validate_ngram_range("baseline.ngram_range", self.baseline.ngram_range)?;
        validate_ngram_range("challenger.ngram_range", self.challenger.ngram_range)?;

        if self.baseline.c <= 0.0 || self.baseline.c.is_nan() {
            return Err(SpamError::configuration(format!(
                "baseline.C must be positive, got {}",
                self.baseline.c
            )));
        }
        if self.baseline.max_iter == 0 {
            return Err(SpamError::configuration("baseline.max_iter must be positive"));
        }
        if self.baseline.max_features == 0 {
            return Err(SpamError::configuration(
                "baseline.max_features must be positive",
            ));
        }
        if self.baseline.learning_rate <= 0.0 || self.baseline.learning_rate.is_nan() {
            return Err(SpamError::configuration(
                "baseline.learning_rate must be positive",
            ));
        }
        if self.challenger.alpha <= 0.0 || self.challenger.alpha.is_nan() {
            return Err(SpamError::configuration(format!(
                "challenger.alpha must be positive, got {}",
                self.challenger.alpha
            )));
        }

        Ok(())
    }
}

fn validate_ngram_range(key: &str, (min_n, max_n): (usize, usize)) -> Result<()> {
    if min_n == 0 || min_n > max_n {
        return Err(SpamError::configuration(format!(
            "{key} must satisfy 1 <= min <= max, got [{min_n}, {max_n}]"
        )));
    }
    Ok(())
}
