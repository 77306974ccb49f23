//! Persistence of the comparison document.
//!
//! The document is a JSON object with the keys `timestamp`, `test_samples`,
//! `baseline_metrics`, `challenger_metrics`, `comparison` and `summary`.
//! It is always written through a temp file and a rename, so concurrent
//! readers see either the previous document or the new one.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpamError};
use crate::evaluation::comparison::ComparisonRecord;
use crate::evaluation::metrics::ClassificationMetrics;
use crate::util::fs::write_json_atomic;

/// The persisted result of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    /// ISO-8601 time of the run.
    pub timestamp: String,
    pub test_samples: u64,
    pub baseline_metrics: ClassificationMetrics,
    #[serde(alias = "distilbert_metrics")]
    pub challenger_metrics: ClassificationMetrics,
    pub comparison: ComparisonRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

/// Short digest of a run for dashboards and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub models_evaluated: Vec<String>,
    pub best_model: String,
    pub best_f1_score: f64,
    pub target_achieved: bool,
    /// True when one of the models could not be evaluated.
    #[serde(default)]
    pub partial: bool,
}

impl ResultDocument {
    /// Assemble a document stamped with the current time.
    pub fn new(
        record: &ComparisonRecord,
        metrics_a: &ClassificationMetrics,
        metrics_b: &ClassificationMetrics,
    ) -> Self {
        let mut models_evaluated = Vec::with_capacity(2);
        if !metrics_a.is_zeroed() {
            models_evaluated.push(record.baseline_name.clone());
        }
        if !metrics_b.is_zeroed() {
            models_evaluated.push(record.challenger_name.clone());
        }

        let summary = RunSummary {
            partial: models_evaluated.len() < 2,
            models_evaluated,
            best_model: record.best_model.clone(),
            best_f1_score: record.best_metrics().f1,
            target_achieved: record.target_achieved(),
        };

        ResultDocument {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            test_samples: metrics_a.total().max(metrics_b.total()),
            baseline_metrics: metrics_a.clone(),
            challenger_metrics: metrics_b.clone(),
            comparison: record.clone(),
            summary: Some(summary),
        }
    }

    /// Write this document to `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        write_json_atomic(path, self)?;
        info!("Saved evaluation results to {}", path.display());
        Ok(())
    }
}

/// Build the document for a comparison and persist it at `path`.
pub fn save<P: AsRef<Path>>(
    record: &ComparisonRecord,
    metrics_a: &ClassificationMetrics,
    metrics_b: &ClassificationMetrics,
    path: P,
) -> Result<ResultDocument> {
    let document = ResultDocument::new(record, metrics_a, metrics_b);
    document.write(path)?;
    Ok(document)
}

/// Read the whole document at `path`.
///
/// # Errors
///
/// - [`SpamError::NotFound`] if there is no file at `path`.
/// - [`SpamError::CorruptDocument`] if it is not valid JSON or lacks a
///   required field.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<ResultDocument> {
    let path = path.as_ref();
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SpamError::not_found(format!(
                "no evaluation results at {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let document: ResultDocument = serde_json::from_str(&json)
        .map_err(|e| SpamError::corrupt(format!("{}: {e}", path.display())))?;
    debug!(
        "Loaded evaluation results from {} ({})",
        path.display(),
        document.timestamp
    );
    Ok(document)
}

/// Read the comparison and both models' metrics from `path`.
pub fn load<P: AsRef<Path>>(
    path: P,
) -> Result<(ComparisonRecord, ClassificationMetrics, ClassificationMetrics)> {
    let document = load_document(path)?;
    Ok((
        document.comparison,
        document.baseline_metrics,
        document.challenger_metrics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::comparison::{compare, compare_partial};
    use crate::evaluation::metrics::ClassificationMetrics;
    use tempfile::TempDir;

    fn sample_metrics() -> (ClassificationMetrics, ClassificationMetrics) {
        let a = ClassificationMetrics::from_confusion_matrix([[9, 1], [2, 8]]).unwrap();
        let b = ClassificationMetrics::from_confusion_matrix([[10, 0], [1, 9]]).unwrap();
        (a, b)
    }

    #[test]
    fn test_round_trip_is_exact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results").join("evaluation_results.json");
        let (a, b) = sample_metrics();
        let record = compare(&a, &b, 0.95, "baseline", "challenger");

        let saved = save(&record, &a, &b, &path).unwrap();
        let (loaded_record, loaded_a, loaded_b) = load(&path).unwrap();

        assert_eq!(loaded_record, record);
        assert_eq!(loaded_a, a);
        assert_eq!(loaded_b, b);
        assert_eq!(load_document(&path).unwrap(), saved);
        assert_eq!(saved.test_samples, 20);
    }

    #[test]
    fn test_document_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evaluation_results.json");
        let (a, b) = sample_metrics();
        save(&compare(&a, &b, 0.9, "baseline", "challenger"), &a, &b, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "timestamp",
            "test_samples",
            "baseline_metrics",
            "challenger_metrics",
            "comparison",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert!(
            chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok()
        );
    }

    #[test]
    fn test_partial_summary() {
        let (a, _) = sample_metrics();
        let record = compare_partial(Some(&a), None, 0.95, "baseline", "challenger").unwrap();
        let document = ResultDocument::new(&record, &a, &ClassificationMetrics::zeroed());

        let summary = document.summary.unwrap();
        assert!(summary.partial);
        assert_eq!(summary.models_evaluated, vec!["baseline".to_string()]);
        assert_eq!(summary.best_model, "baseline");
        assert_eq!(summary.best_f1_score, a.f1);
        assert!(!summary.target_achieved);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SpamError::NotFound(_)));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evaluation_results.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, SpamError::CorruptDocument(_)));
    }

    #[test]
    fn test_missing_field_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evaluation_results.json");
        std::fs::write(&path, r#"{"timestamp": "2024-01-01T00:00:00Z", "test_samples": 3}"#)
            .unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, SpamError::CorruptDocument(_)));
    }
}
