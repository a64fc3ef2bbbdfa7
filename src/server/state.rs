//! Shared serving state built from a finished pipeline run

use crate::inference::Predictor;
use crate::monitoring::MonitorLog;
use crate::pipeline::PipelineRun;
use crate::preprocessing::frame_to_matrix;
use crate::training::{ModelKind, TrainedRegressor};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Serializable per-model summary shown on the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRow {
    pub name: String,
    pub kind: ModelKind,
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mse: f64,
    pub cv_r2_mean: f64,
    pub cv_r2_std: f64,
    pub training_secs: f64,
}

/// Application state shared across handlers. The monitor log is the only
/// mutable piece; everything else is frozen at startup.
pub struct ServeState {
    pub best_name: String,
    pub best_kind: ModelKind,
    pub best_score: f64,
    pub scores: Vec<ScoreRow>,
    pub importance: Vec<(String, f64)>,
    pub artifact_paths: Vec<PathBuf>,
    pub predictor: Predictor,
    pub model: TrainedRegressor,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
    pub monitor: RwLock<MonitorLog>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl ServeState {
    pub fn from_run(run: PipelineRun) -> crate::error::Result<Self> {
        let scores = run
            .reports
            .iter()
            .map(|r| ScoreRow {
                name: r.name.clone(),
                kind: r.kind,
                r2: r.metrics.r2,
                rmse: r.metrics.rmse,
                mae: r.metrics.mae,
                mse: r.metrics.mse,
                cv_r2_mean: r.cv_r2_mean,
                cv_r2_std: r.cv_r2_std,
                training_secs: r.training_secs,
            })
            .collect();

        let x_test = frame_to_matrix(&run.prepared.x_test, &run.prepared.feature_names)?;
        let model = run.predictor.model().clone();

        Ok(Self {
            best_name: run.best_name,
            best_kind: run.best_kind,
            best_score: run.best_score,
            scores,
            importance: run.importance,
            artifact_paths: run.artifacts,
            predictor: run.predictor,
            model,
            x_test,
            y_test: run.prepared.y_test.clone(),
            monitor: RwLock::new(run.monitor),
            started_at: chrono::Utc::now(),
        })
    }
}
