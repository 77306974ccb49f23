//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, SpamArgs};
use crate::error::Result;
use crate::evaluation::ClassificationMetrics;

/// Result structure for dataset preparation.
#[derive(Debug, Serialize, Deserialize)]
pub struct PreparationResult {
    pub data_dir: String,
    pub train_samples: usize,
    pub test_samples: usize,
    /// `[ham, spam]` counts in the training table.
    pub train_class_counts: [usize; 2],
    /// `[ham, spam]` counts in the test table.
    pub test_class_counts: [usize; 2],
}

/// Training outcome of one model.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelTrainingResult {
    pub model_type: String,
    pub model_name: String,
    pub train_f1: f64,
    pub test_metrics: ClassificationMetrics,
    pub achieves_target: bool,
    pub training_time_ms: u64,
    pub artifact: String,
    pub run_id: Option<String>,
}

/// Result structure for a training command.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingReport {
    pub target_f1: f64,
    pub models: Vec<ModelTrainingResult>,
}

/// Body printed when there is no usable comparison document.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnavailableComparison {
    pub available: bool,
    pub reason: String,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &SpamArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &SpamArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    // Convert to JSON value for easier manipulation
    let value = serde_json::to_value(result)?;

    match result {
        _ if std::any::type_name::<T>().contains("ResultDocument") => {
            output_comparison_human(&value, args)
        }
        _ if std::any::type_name::<T>().contains("TrainingReport") => {
            output_training_human(&value, args)
        }
        _ => output_generic_human(&value, args),
    }
}

/// Output a comparison document in human format.
fn output_comparison_human(value: &serde_json::Value, _args: &SpamArgs) -> Result<()> {
    let Some(comparison) = value.get("comparison").and_then(|c| c.as_object()) else {
        return output_generic_human(value, _args);
    };

    println!("Model Comparison:");
    println!("═════════════════");

    if let Some(timestamp) = value.get("timestamp").and_then(|t| t.as_str()) {
        println!("Evaluated at: {timestamp}");
    }
    if let Some(samples) = value.get("test_samples").and_then(|s| s.as_u64()) {
        println!("Test samples: {samples}");
    }

    let target = comparison
        .get("target_f1")
        .and_then(|t| t.as_f64())
        .unwrap_or_default();

    for (slot, achieves_key) in [
        ("baseline", "baseline_achieves_target"),
        ("challenger", "challenger_achieves_target"),
    ] {
        let name = comparison
            .get(&format!("{slot}_name"))
            .and_then(|n| n.as_str())
            .unwrap_or(slot);

        println!();
        println!("{name}:");
        println!("{}", "─".repeat(name.chars().count() + 1));

        if let Some(metrics) = comparison.get(slot) {
            print_metrics(metrics);
        }
        let achieves = comparison
            .get(achieves_key)
            .and_then(|a| a.as_bool())
            .unwrap_or(false);
        println!("  Target F1 >= {target:.2}: {}", yes_no(achieves));
    }

    println!();
    if let Some(best) = comparison.get("best_model").and_then(|b| b.as_str()) {
        println!("Best model: {best}");
    }
    if let Some(improvement) = comparison.get("improvement").and_then(|i| i.as_f64()) {
        println!("F1 difference: {improvement:.4}");
    }
    if value
        .pointer("/summary/partial")
        .and_then(|p| p.as_bool())
        .unwrap_or(false)
    {
        println!("Note: only one model could be evaluated");
    }
    Ok(())
}

/// Output a training report in human format.
fn output_training_human(value: &serde_json::Value, _args: &SpamArgs) -> Result<()> {
    println!("Training Results:");
    println!("═════════════════");

    let target = value
        .get("target_f1")
        .and_then(|t| t.as_f64())
        .unwrap_or_default();

    for model in value
        .get("models")
        .and_then(|m| m.as_array())
        .into_iter()
        .flatten()
    {
        let name = model
            .get("model_name")
            .and_then(|n| n.as_str())
            .unwrap_or("model");
        println!();
        println!("{name}:");
        println!("{}", "─".repeat(name.chars().count() + 1));

        if let Some(train_f1) = model.get("train_f1").and_then(|f| f.as_f64()) {
            println!("  Train F1-Score: {train_f1:.4}");
        }
        if let Some(metrics) = model.get("test_metrics") {
            print_metrics(metrics);
        }
        let achieves = model
            .get("achieves_target")
            .and_then(|a| a.as_bool())
            .unwrap_or(false);
        println!("  Target F1 >= {target:.2}: {}", yes_no(achieves));
        if let Some(ms) = model.get("training_time_ms").and_then(|t| t.as_u64()) {
            println!("  Training time: {ms}ms");
        }
        if let Some(artifact) = model.get("artifact").and_then(|a| a.as_str()) {
            println!("  Saved to: {artifact}");
        }
    }
    Ok(())
}

fn print_metrics(metrics: &serde_json::Value) {
    for (label, key) in [
        ("F1-Score", "f1_score"),
        ("Accuracy", "accuracy"),
        ("Precision", "precision"),
        ("Recall", "recall"),
    ] {
        if let Some(v) = metrics.get(key).and_then(|v| v.as_f64()) {
            println!("  {label}: {v:.4}");
        }
    }
    if let Some(cm) = metrics.get("confusion_matrix") {
        let formatted_cm = format_value(cm);
        println!("  Confusion matrix: {formatted_cm}");
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Output generic data in human format.
fn output_generic_human(value: &serde_json::Value, _args: &SpamArgs) -> Result<()> {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                let formatted_val = format_value(val);
                println!("{key}: {formatted_val}");
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{formatted_value}");
        }
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &SpamArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}
