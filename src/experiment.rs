//! Offline experiments: run a fresh area over points and seeds read from a
//! JSON file, without going through the HTTP service.
//!
//! ```json
//! {
//!   "points":   [[1, 1], [2, 2], {"x": 9, "y": 9}],
//!   "clusters": [[0, 0], [10, 10]],
//!   "dist_id":  1,
//!   "max_age":  100
//! }
//! ```

use crate::clustering::{AreaStats, ClusterView, DistanceFunc, Training};
use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::http::envelope::{PointInput, into_points};
use crate::storage::AreaStore;
use crate::types::MaxAge;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct Experiment {
    #[serde(default)]
    pub points: Vec<PointInput>,
    #[serde(default)]
    pub clusters: Vec<PointInput>,
    #[serde(default)]
    pub dist_id: i64,
    #[serde(default)]
    pub max_age: i64,
}

/// Command-line overrides; `None` keeps the file's value.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    pub dist_id: Option<i64>,
    pub max_age: Option<i64>,
    pub by_step: bool,
}

#[derive(Debug, Serialize)]
pub struct ExperimentOutcome {
    pub finished: bool,
    pub metric: &'static str,
    pub stats: AreaStats,
    pub clusters: Vec<ClusterView>,
}

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("Failed to read experiment file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Experiment file '{path}' is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Experiment {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExperimentError> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|source| ExperimentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&content).map_err(|source| ExperimentError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the experiment into a new area and trains it.
    ///
    /// Zero ids and budgets fall back to `defaults`, exactly as the HTTP
    /// service does.
    pub fn run(
        self,
        options: RunOptions,
        defaults: &TrainingConfig,
    ) -> Result<ExperimentOutcome, ExperimentError> {
        let dist_id = match options.dist_id.unwrap_or(self.dist_id) {
            0 => i64::from(defaults.default_distance),
            id => id,
        };
        let max_age = match options.max_age.unwrap_or(self.max_age) {
            0 => i64::from(defaults.default_max_age),
            age => age,
        };
        let metric = DistanceFunc::lookup(dist_id)?;
        let training = if options.by_step {
            Training::Step
        } else {
            Training::UpTo(MaxAge::new(max_age)?)
        };

        let store = AreaStore::with_tolerance(defaults.tolerance);
        let area = store.get(store.create())?;
        area.add_clusters(into_points(self.clusters)?)?;
        area.add_points(into_points(self.points)?)?;

        let report = area.train_and_report(metric, training);
        let stats = area.stats();
        info!(
            %metric,
            finished = report.finished,
            iterations = report.iterations,
            points = stats.points,
            clusters = stats.clusters,
            "experiment finished"
        );

        Ok(ExperimentOutcome {
            finished: report.finished,
            metric: metric.name(),
            stats,
            clusters: report.clusters,
        })
    }
}
