//! Training orchestration: fit the roster, score on the held-out partition,
//! cross-validate each candidate

use super::cross_validation::{CvSummary, KFold};
use super::metrics::RegressionMetrics;
use super::model::{ModelKind, ModelParams, TrainedRegressor};
use crate::config::ModelSpec;
use crate::error::{FloodcastError, Result};
use crate::preprocessing::{frame_to_matrix, PreparedData};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Everything recorded for one trained candidate
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub name: String,
    pub kind: ModelKind,
    #[serde(skip)]
    pub model: TrainedRegressor,
    pub metrics: RegressionMetrics,
    pub cv_r2_mean: f64,
    pub cv_r2_std: f64,
    pub training_secs: f64,
}

/// The full training run output
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub reports: Vec<ModelReport>,
}

/// Trains every configured model on the same prepared partitions.
pub struct Trainer {
    cv_folds: usize,
    seed: u64,
}

impl Trainer {
    pub fn new(cv_folds: usize, seed: u64) -> Self {
        Self { cv_folds, seed }
    }

    /// Fit, evaluate, and cross-validate each spec in roster order.
    /// A fit failure is fatal: remaining models are not attempted.
    pub fn train_all(&self, specs: &[ModelSpec], prepared: &PreparedData) -> Result<TrainingOutcome> {
        if specs.is_empty() {
            return Err(FloodcastError::NoModelsAvailable);
        }

        let x_train = frame_to_matrix(&prepared.x_train, &prepared.feature_names)?;
        let x_test = frame_to_matrix(&prepared.x_test, &prepared.feature_names)?;

        let mut reports = Vec::with_capacity(specs.len());

        for spec in specs {
            let report =
                self.train_one(spec, &x_train, &prepared.y_train, &x_test, &prepared.y_test)?;
            info!(
                model = %report.name,
                r2 = report.metrics.r2,
                rmse = report.metrics.rmse,
                cv_r2 = report.cv_r2_mean,
                secs = report.training_secs,
                "Model trained"
            );
            reports.push(report);
        }

        Ok(TrainingOutcome { reports })
    }

    pub fn train_one(
        &self,
        spec: &ModelSpec,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<ModelReport> {
        let start = Instant::now();
        let model = TrainedRegressor::fit_new(spec.kind, &spec.params, self.seed, x_train, y_train)?;
        let training_secs = start.elapsed().as_secs_f64();

        let y_pred = model.predict(x_test)?;
        let metrics = RegressionMetrics::compute(y_test, &y_pred);

        let cv = self.cross_val_r2(spec.kind, &spec.params, x_train, y_train)?;

        Ok(ModelReport {
            name: spec.kind.display_name().to_string(),
            kind: spec.kind,
            model,
            metrics,
            cv_r2_mean: cv.mean_score,
            cv_r2_std: cv.std_score,
            training_secs,
        })
    }

    /// K-fold R2 on the training partition only. Fewer than 2 folds
    /// disables cross-validation and yields an empty summary.
    pub fn cross_val_r2(
        &self,
        kind: ModelKind,
        params: &ModelParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<CvSummary> {
        if self.cv_folds < 2 {
            return Ok(CvSummary::from_scores(Vec::new()));
        }

        let splits = KFold::new(self.cv_folds)
            .with_random_state(self.seed)
            .split(x.nrows())?;

        let mut scores = Vec::with_capacity(splits.len());
        for split in &splits {
            let x_tr = x.select(ndarray::Axis(0), &split.train_indices);
            let y_tr: Array1<f64> =
                Array1::from_vec(split.train_indices.iter().map(|&i| y[i]).collect());
            let x_va = x.select(ndarray::Axis(0), &split.test_indices);
            let y_va: Array1<f64> =
                Array1::from_vec(split.test_indices.iter().map(|&i| y[i]).collect());

            let model = TrainedRegressor::fit_new(kind, params, self.seed, &x_tr, &y_tr)?;
            let y_pred = model.predict(&x_va)?;
            scores.push(RegressionMetrics::compute(&y_va, &y_pred).r2);
        }

        Ok(CvSummary::from_scores(scores))
    }
}
