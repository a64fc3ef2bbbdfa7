//! End-to-end pipeline: load, preprocess, train, select, tune, explain,
//! visualize, persist, and warm up monitoring

use crate::config::PipelineConfig;
use crate::data::DatasetLoader;
use crate::error::Result;
use crate::explain::feature_importance;
use crate::inference::Predictor;
use crate::monitoring::MonitorLog;
use crate::persist::ModelArtifact;
use crate::preprocessing::{
    frame_to_matrix, FeatureRecipe, PreparedData, Preprocessor, ScalerType,
};
use crate::selection::{select_best, GridSearch};
use crate::training::{ModelKind, ModelReport, Trainer};
use crate::visualization::Visualizer;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Everything a finished pipeline run produced.
#[derive(Debug)]
pub struct PipelineRun {
    pub reports: Vec<ModelReport>,
    pub best_name: String,
    pub best_kind: ModelKind,
    pub best_score: f64,
    pub importance: Vec<(String, f64)>,
    pub artifacts: Vec<PathBuf>,
    pub monitor: MonitorLog,
    pub model_path: PathBuf,
    pub sample_prediction: Option<f64>,
    pub predictor: Predictor,
    pub prepared: PreparedData,
}

/// Runs the stages in order with per-stage logging. Construction takes only
/// the config; all state flows through [`Pipeline::run`].
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<PipelineRun> {
        let config = &self.config;
        config.validate()?;

        info!(data = %config.data_path.display(), "Pipeline started");

        // Load
        let loader = DatasetLoader::new(&config.target_column).with_retry(config.retry.clone());
        let data = loader.load(&config.data_path)?;
        info!(rows = data.table.height(), "Dataset loaded");

        // Preprocess
        let scaler_type = if config.scale_features {
            ScalerType::Standard
        } else {
            ScalerType::None
        };
        let prepared = Preprocessor::new(FeatureRecipe::flood_default())
            .with_scaler(scaler_type)
            .with_test_size(config.test_size)
            .with_seed(config.random_state)
            .run(&data)?;

        // Train the roster
        let trainer = Trainer::new(config.cv_folds, config.random_state);
        let outcome = trainer.train_all(&config.models, &prepared)?;

        // Select, then tune the winner if a grid is configured
        let selection = select_best(&outcome.reports, config.scoring)?;
        let base_params = config
            .models
            .iter()
            .find(|spec| spec.kind == selection.kind)
            .map(|spec| spec.params.clone())
            .unwrap_or_default();

        let selection = match config.grids.get(&selection.kind) {
            Some(grid) if !grid.is_empty() => {
                let search = GridSearch::new(config.cv_folds, config.random_state);
                let (tuned, params) =
                    search.tune(selection, &base_params, grid, config.scoring, &prepared)?;
                info!(model = %tuned.name, ?params, "Winner tuned");
                tuned
            }
            _ => selection,
        };

        // Explain on the held-out partition
        let x_test = frame_to_matrix(&prepared.x_test, &prepared.feature_names)?;
        let importance = feature_importance(
            &selection.model,
            &x_test,
            &prepared.y_test,
            &prepared.feature_names,
            config.random_state,
        )?;

        // Visualize
        let predictions = selection.model.predict(&x_test)?;
        let artifacts = Visualizer::new(&config.output_dir).render_all(
            &outcome.reports,
            &importance,
            &predictions,
            &x_test,
            &prepared.feature_names,
        );

        // First monitor sample against the held-out partition
        let mut monitor = MonitorLog::new(config.monitor_r2_threshold);
        monitor.observe(&selection.model, &x_test, &prepared.y_test)?;

        // Persist
        let artifact = ModelArtifact::new(
            selection.name.clone(),
            selection.model.clone(),
            prepared.scaler.clone(),
            prepared.recipe.clone(),
            prepared.feature_names.clone(),
        );
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let model_path = config.output_dir.join(format!("best_model_{stamp}.json"));
        artifact.save(&model_path)?;

        // Smoke-test the serving path with the first raw test row
        let predictor = Predictor::from_artifact(&artifact);
        let sample_prediction = self.sample_prediction(&predictor, &data.features);

        info!(
            best = %selection.name,
            score = selection.score,
            artifacts = artifacts.len(),
            "Pipeline finished"
        );

        Ok(PipelineRun {
            reports: outcome.reports,
            best_name: selection.name,
            best_kind: selection.kind,
            best_score: selection.score,
            importance,
            artifacts,
            monitor,
            model_path,
            sample_prediction,
            predictor,
            prepared,
        })
    }

    /// Predict from the first raw row, if one can be assembled
    fn sample_prediction(
        &self,
        predictor: &Predictor,
        features: &polars::prelude::DataFrame,
    ) -> Option<f64> {
        let mut row = BTreeMap::new();
        for name in predictor.raw_schema() {
            let value = features
                .column(name.as_str())
                .ok()?
                .as_materialized_series()
                .cast(&polars::prelude::DataType::Float64)
                .ok()?
                .f64()
                .ok()?
                .get(0)?;
            row.insert(name.clone(), value);
        }
        predictor.predict(&row).ok()
    }
}
