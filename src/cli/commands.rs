//! Command implementations for the spam detector CLI.

use std::sync::Arc;

use log::{error, info, warn};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::AppConfig;
use crate::dataset::{DatasetSplit, class_counts, prepare_split};
use crate::dataset::loader::build_split;
use crate::error::{Result, SpamError};
use crate::evaluation::{RunState, load_document, run_full_evaluation};
use crate::ml::{ModelKind, train_and_save};
use crate::serving::{ModelStatusRequest, PredictRequest, ServingState, serve};
use crate::tracking::{self, ExperimentTracker, NoopTracker};

/// Execute a CLI command.
pub fn execute_command(args: SpamArgs) -> Result<()> {
    let config = AppConfig::resolve(args.config.as_deref())?;

    match &args.command {
        Command::Prepare(prepare_args) => prepare(prepare_args.clone(), &config, &args),
        Command::Train(train_args) => train(train_args.clone(), &config, &args),
        Command::Evaluate => evaluate(&config, &args),
        Command::Predict(predict_args) => predict(predict_args.clone(), config, &args),
        Command::Status(status_args) => status(status_args.clone(), config, &args),
        Command::Report => report(&config, &args),
        Command::Serve(serve_args) => serve_http(serve_args.clone(), config),
    }
}

/// Build and persist the train/test split.
fn prepare(args: PrepareArgs, config: &AppConfig, cli_args: &SpamArgs) -> Result<()> {
    if cli_args.verbosity() > 1 {
        println!("Reading raw corpus: {}", config.data.data_path.display());
    }

    let split = if args.force {
        build_split(config)?
    } else {
        prepare_split(config)?
    };

    output_result(
        "Dataset prepared successfully",
        &preparation_result(&split, config),
        cli_args,
    )
}

fn preparation_result(split: &DatasetSplit, config: &AppConfig) -> PreparationResult {
    PreparationResult {
        data_dir: config.paths.data_dir.to_string_lossy().to_string(),
        train_samples: split.train.len(),
        test_samples: split.test.len(),
        train_class_counts: class_counts(&split.train),
        test_class_counts: class_counts(&split.test),
    }
}

/// Train the selected models.
fn train(args: TrainArgs, config: &AppConfig, cli_args: &SpamArgs) -> Result<()> {
    let split = prepare_split(config)?;
    if cli_args.verbosity() > 1 {
        println!(
            "Training on {} messages, testing on {}",
            split.train.len(),
            split.test.len()
        );
    }

    let mut tracker: Box<dyn ExperimentTracker> = if args.should_track() {
        tracking::from_config(&config.tracking)
    } else {
        Box::new(NoopTracker)
    };

    let mut models = Vec::new();
    for kind in args.model.kinds() {
        let outcome = train_and_save(kind, config, &split, tracker.as_mut())?;
        models.push(ModelTrainingResult {
            model_type: outcome.kind.as_str().to_string(),
            model_name: outcome.model_name,
            train_f1: outcome.summary.train_f1,
            test_metrics: outcome.test_metrics,
            achieves_target: outcome.achieves_target,
            training_time_ms: outcome.summary.training_time_ms,
            artifact: outcome.artifact.to_string_lossy().to_string(),
            run_id: outcome.run_id,
        });
    }

    output_result(
        "Training completed successfully",
        &TrainingReport {
            target_f1: config.evaluation.target_f1_score,
            models,
        },
        cli_args,
    )
}

/// Evaluate both models and persist the comparison.
fn evaluate(config: &AppConfig, cli_args: &SpamArgs) -> Result<()> {
    let (document, state) = run_full_evaluation(config)?;
    if state == RunState::Partial {
        warn!("Evaluation finished with only one model available");
    }
    info!(
        "Evaluation results written to {}",
        config.paths.results_file().display()
    );

    output_result("Evaluation completed", &document, cli_args)
}

/// Classify one message through the prediction service.
fn predict(args: PredictArgs, config: AppConfig, cli_args: &SpamArgs) -> Result<()> {
    let service = ServingState::new(config);
    if let Ok(kind) = args.model.parse::<ModelKind>() {
        // A missing model is reported through the response below.
        if let Err(e) = service.reload(kind) {
            warn!("Could not load {kind} model: {e}");
        }
    }

    let response = service.predict(&PredictRequest {
        message: args.message,
        model_type: args.model,
    });
    if response.is_error() {
        error!("Prediction failed: {}", response.error_message);
        return Err(SpamError::model_unavailable(response.error_message));
    }

    output_result("Prediction", &response, cli_args)
}

/// Report whether a model is available and its stored F1.
fn status(args: StatusArgs, config: AppConfig, cli_args: &SpamArgs) -> Result<()> {
    let service = ServingState::load(config);
    let response = service.model_status(&ModelStatusRequest {
        model_type: args.model,
    });

    output_result("Model status", &response, cli_args)
}

/// Render the stored comparison document.
fn report(config: &AppConfig, cli_args: &SpamArgs) -> Result<()> {
    match load_document(config.paths.results_file()) {
        Ok(document) => output_result("Stored comparison", &document, cli_args),
        Err(e) if e.is_unavailable() => {
            warn!("Comparison unavailable: {e}");
            output_result(
                "Comparison unavailable",
                &UnavailableComparison {
                    available: false,
                    reason: e.to_string(),
                },
                cli_args,
            )
        }
        Err(e) => Err(e),
    }
}

/// Run the HTTP service on a tokio runtime until ctrl-c.
fn serve_http(args: ServeArgs, config: AppConfig) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.serving.host.clone());
    let port = args.port.unwrap_or(config.serving.port);

    let state = Arc::new(ServingState::load(config));
    if state.loaded_models().is_empty() {
        warn!("No trained models found; predictions will report errors until a reload");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(state, &host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Label, LabeledMessage};

    #[test]
    fn test_preparation_result_counts() {
        let split = DatasetSplit {
            train: vec![
                LabeledMessage::new("a", Label::Ham),
                LabeledMessage::new("b", Label::Spam),
                LabeledMessage::new("c", Label::Ham),
            ],
            test: vec![LabeledMessage::new("d", Label::Spam)],
        };

        let result = preparation_result(&split, &AppConfig::default());
        assert_eq!(result.train_samples, 3);
        assert_eq!(result.test_samples, 1);
        assert_eq!(result.train_class_counts, [2, 1]);
        assert_eq!(result.test_class_counts, [0, 1]);
        assert_eq!(result.data_dir, "data");
    }
}
