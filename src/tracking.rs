//! File-based experiment tracking.
//!
//! Every run gets its own directory:
//!
//! ```text
//! <dir>/<experiment>/<run_id>/
//!     meta.json     run id, name, status, start and end time
//!     params.json   string parameters
//!     metrics.json  numeric metrics
//! ```
//!
//! Logging the same key twice in a run keeps the latest value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TrackingConfig;
use crate::error::{Result, SpamError};
use crate::evaluation::ClassificationMetrics;
use crate::util::fs::write_json_atomic;

pub const META_FILE_NAME: &str = "meta.json";
pub const PARAMS_FILE_NAME: &str = "params.json";
pub const METRICS_FILE_NAME: &str = "metrics.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub run_name: String,
    pub experiment: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Records parameters and metrics of training runs.
pub trait ExperimentTracker: Send {
    /// Open a new run and return its id.
    fn start_run(&mut self, run_name: &str) -> Result<String>;

    fn log_params(&mut self, params: &BTreeMap<String, String>) -> Result<()>;

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()>;

    /// Close the active run with a final status.
    fn end_run(&mut self, status: RunStatus) -> Result<()>;
}

/// Build the tracker selected by configuration.
pub fn from_config(config: &TrackingConfig) -> Box<dyn ExperimentTracker> {
    if config.enabled {
        Box::new(FileTracker::new(&config.dir, &config.experiment_name))
    } else {
        debug!("Experiment tracking disabled");
        Box::new(NoopTracker)
    }
}

/// Flatten classification metrics into `<prefix>_<name>` entries.
pub fn metrics_map(prefix: &str, metrics: &ClassificationMetrics) -> BTreeMap<String, f64> {
    [
        ("f1_score", metrics.f1),
        ("accuracy", metrics.accuracy),
        ("precision", metrics.precision),
        ("recall", metrics.recall),
        ("precision_ham", metrics.precision_ham),
        ("recall_ham", metrics.recall_ham),
        ("precision_spam", metrics.precision_spam),
        ("recall_spam", metrics.recall_spam),
    ]
    .into_iter()
    .map(|(name, value)| (format!("{prefix}_{name}"), value))
    .collect()
}

/// Log through a tracker without letting tracking failures escape.
pub fn log_quietly<F>(tracker: &mut dyn ExperimentTracker, what: &str, f: F)
where
    F: FnOnce(&mut dyn ExperimentTracker) -> Result<()>,
{
    if let Err(e) = f(tracker) {
        warn!("Experiment tracking failed to {what}: {e}");
    }
}

#[derive(Debug)]
struct ActiveRun {
    dir: PathBuf,
    meta: RunMeta,
    params: BTreeMap<String, String>,
    metrics: BTreeMap<String, f64>,
}

/// Tracker writing JSON files under `<dir>/<experiment>`.
#[derive(Debug)]
pub struct FileTracker {
    experiment_dir: PathBuf,
    experiment: String,
    active: Option<ActiveRun>,
}

impl FileTracker {
    pub fn new<P: AsRef<Path>>(dir: P, experiment: &str) -> Self {
        FileTracker {
            experiment_dir: dir.as_ref().join(experiment),
            experiment: experiment.to_string(),
            active: None,
        }
    }

    /// Directory of the active run, if any.
    pub fn run_dir(&self) -> Option<&Path> {
        self.active.as_ref().map(|run| run.dir.as_path())
    }

    /// Read back the metadata of a finished or active run.
    pub fn read_meta(&self, run_id: &str) -> Result<RunMeta> {
        let path = self.experiment_dir.join(run_id).join(META_FILE_NAME);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| SpamError::not_found(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| SpamError::corrupt(format!("{}: {e}", path.display())))
    }

    fn active_mut(&mut self) -> Result<&mut ActiveRun> {
        self.active
            .as_mut()
            .ok_or_else(|| SpamError::invalid_operation("no active tracking run"))
    }
}

impl ExperimentTracker for FileTracker {
    fn start_run(&mut self, run_name: &str) -> Result<String> {
        if let Some(run) = &self.active {
            return Err(SpamError::invalid_operation(format!(
                "tracking run {} is still active",
                run.meta.run_id
            )));
        }

        let run_id = Uuid::new_v4().simple().to_string();
        let dir = self.experiment_dir.join(&run_id);
        let meta = RunMeta {
            run_id: run_id.clone(),
            run_name: run_name.to_string(),
            experiment: self.experiment.clone(),
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
        };
        write_json_atomic(dir.join(META_FILE_NAME), &meta)?;

        info!(
            "Started tracking run '{run_name}' ({run_id}) in {}",
            self.experiment_dir.display()
        );
        self.active = Some(ActiveRun {
            dir,
            meta,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
        });
        Ok(run_id)
    }

    fn log_params(&mut self, params: &BTreeMap<String, String>) -> Result<()> {
        let run = self.active_mut()?;
        run.params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        write_json_atomic(run.dir.join(PARAMS_FILE_NAME), &run.params)
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        let run = self.active_mut()?;
        run.metrics.extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
        write_json_atomic(run.dir.join(METRICS_FILE_NAME), &run.metrics)
    }

    fn end_run(&mut self, status: RunStatus) -> Result<()> {
        let mut run = self
            .active
            .take()
            .ok_or_else(|| SpamError::invalid_operation("no active tracking run"))?;

        run.meta.status = status;
        run.meta.end_time = Some(Utc::now());
        write_json_atomic(run.dir.join(META_FILE_NAME), &run.meta)?;

        info!("Ended tracking run {} ({:?})", run.meta.run_id, status);
        Ok(())
    }
}

/// Tracker used when tracking is disabled.
#[derive(Debug, Default)]
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn start_run(&mut self, _run_name: &str) -> Result<String> {
        Ok(String::new())
    }

    fn log_params(&mut self, _params: &BTreeMap<String, String>) -> Result<()> {
        Ok(())
    }

    fn log_metrics(&mut self, _metrics: &BTreeMap<String, f64>) -> Result<()> {
        Ok(())
    }

    fn end_run(&mut self, _status: RunStatus) -> Result<()> {
        Ok(())
    }
}
