//! Command line argument parsing for the spam detector CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ml::ModelKind;

/// SMS spam detector - train, evaluate and serve two spam classifiers
#[derive(Parser, Debug, Clone)]
#[command(name = "sms-spam-detector")]
#[command(about = "Train, compare and serve SMS spam classifiers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SpamArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (YAML). Falls back to $SMS_SPAM_CONFIG, then defaults
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SpamArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Clean the raw corpus and persist the stratified train/test split
    Prepare(PrepareArgs),

    /// Train models, score them on the test set and save the artifacts
    Train(TrainArgs),

    /// Evaluate both trained models and persist the comparison
    Evaluate,

    /// Classify a single message
    Predict(PredictArgs),

    /// Show whether a model is loaded and its last F1
    Status(StatusArgs),

    /// Render the stored comparison
    Report,

    /// Run the HTTP prediction service
    Serve(ServeArgs),
}

/// Arguments for preparing the dataset
#[derive(Parser, Debug, Clone)]
pub struct PrepareArgs {
    /// Rebuild the split even if persisted tables exist
    #[arg(long)]
    pub force: bool,
}

/// Which models a command applies to
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelection {
    /// TF-IDF + logistic regression
    Baseline,
    /// Multinomial naive Bayes
    Challenger,
    /// Both models
    All,
}

impl ModelSelection {
    pub fn kinds(self) -> Vec<ModelKind> {
        match self {
            ModelSelection::Baseline => vec![ModelKind::Baseline],
            ModelSelection::Challenger => vec![ModelKind::Challenger],
            ModelSelection::All => ModelKind::ALL.to_vec(),
        }
    }
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Model to train
    #[arg(short, long, default_value = "all")]
    pub model: ModelSelection,

    /// Skip experiment tracking for this run
    #[arg(long)]
    pub no_tracking: bool,
}

/// Arguments for prediction
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Message text
    #[arg(value_name = "MESSAGE")]
    pub message: String,

    /// Model type (baseline or challenger)
    #[arg(short, long, default_value = "baseline")]
    pub model: String,
}

/// Arguments for model status
#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Model type (baseline or challenger)
    #[arg(short, long, default_value = "baseline")]
    pub model: String,
}

/// Arguments for the HTTP service
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind (defaults to serving.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (defaults to serving.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

impl TrainArgs {
    /// Check if experiment tracking should run
    pub fn should_track(&self) -> bool {
        !self.no_tracking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_train_command() {
        let args = SpamArgs::try_parse_from([
            "sms-spam-detector",
            "--config",
            "config/config.yaml",
            "train",
            "--model",
            "challenger",
            "--no-tracking",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("config/config.yaml")));
        if let Command::Train(train_args) = args.command {
            assert_eq!(train_args.model, ModelSelection::Challenger);
            assert_eq!(train_args.model.kinds(), vec![ModelKind::Challenger]);
            assert!(!train_args.should_track());
        } else {
            panic!("Expected Train command");
        }
    }

    #[test]
    fn test_train_defaults_to_all_models() {
        let args = SpamArgs::try_parse_from(["sms-spam-detector", "train"]).unwrap();

        if let Command::Train(train_args) = args.command {
            assert_eq!(train_args.model.kinds(), ModelKind::ALL.to_vec());
            assert!(train_args.should_track());
        } else {
            panic!("Expected Train command");
        }
    }

    #[test]
    fn test_predict_command() {
        let args = SpamArgs::try_parse_from([
            "sms-spam-detector",
            "predict",
            "WINNER! Claim your prize",
            "-m",
            "distilbert",
        ])
        .unwrap();

        if let Command::Predict(predict_args) = args.command {
            assert_eq!(predict_args.message, "WINNER! Claim your prize");
            assert_eq!(predict_args.model, "distilbert");
        } else {
            panic!("Expected Predict command");
        }
    }

    #[test]
    fn test_serve_command() {
        let args =
            SpamArgs::try_parse_from(["sms-spam-detector", "serve", "--port", "9000"]).unwrap();

        if let Command::Serve(serve_args) = args.command {
            assert_eq!(serve_args.port, Some(9000));
            assert!(serve_args.host.is_none());
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        // Default verbosity
        let args = SpamArgs::try_parse_from(["sms-spam-detector", "report"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        // Verbose flag
        let args = SpamArgs::try_parse_from(["sms-spam-detector", "-v", "report"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        // Multiple verbose flags
        let args = SpamArgs::try_parse_from(["sms-spam-detector", "-vv", "report"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        // Quiet flag
        let args = SpamArgs::try_parse_from(["sms-spam-detector", "--quiet", "report"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            SpamArgs::try_parse_from(["sms-spam-detector", "--format", "json", "evaluate"])
                .unwrap();
        assert!(matches!(args.output_format, OutputFormat::Json));
        assert!(matches!(args.command, Command::Evaluate));
    }

    #[test]
    fn test_unknown_model_selection_rejected() {
        let result =
            SpamArgs::try_parse_from(["sms-spam-detector", "train", "--model", "bert"]);
        assert!(result.is_err());
    }
}
