//! Pipeline configuration

use crate::data::RetryPolicy;
use crate::error::{FloodcastError, Result};
use crate::selection::{ParamGrid, ScoringPolicy};
use crate::training::{ModelKind, ModelParams};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// One entry in the ordered model roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    #[serde(default)]
    pub params: ModelParams,
}

impl ModelSpec {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            params: ModelParams::default(),
        }
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }
}

/// Full pipeline configuration, loadable from a JSON file.
///
/// Model order matters: it is preserved through training and used as the
/// tie-break order during selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSV file with one target column and numeric predictors
    pub data_path: PathBuf,
    pub target_column: String,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    pub random_state: u64,
    /// K-fold CV folds per trained model (0 or 1 disables CV)
    pub cv_folds: usize,
    pub models: Vec<ModelSpec>,
    /// Per-family hyperparameter grids; an absent or empty grid keeps the
    /// originally trained model
    pub grids: HashMap<ModelKind, ParamGrid>,
    pub scoring: ScoringPolicy,
    /// Standard-scale engineered features (fitted on train only)
    pub scale_features: bool,
    /// Directory for artifacts: plots, persisted models
    pub output_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Seconds between background monitor refreshes while serving
    pub monitor_interval_secs: u64,
    /// R2 below this emits a warning from the monitor
    pub monitor_r2_threshold: f64,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/flood.csv"),
            target_column: "FloodProbability".to_string(),
            test_size: 0.2,
            random_state: 42,
            cv_folds: 5,
            models: vec![
                ModelSpec::new(ModelKind::LinearRegression),
                ModelSpec::new(ModelKind::RandomForest),
                ModelSpec::new(ModelKind::GradientBoosting),
                ModelSpec::new(ModelKind::NewtonBoosting),
            ],
            grids: HashMap::new(),
            scoring: ScoringPolicy::R2,
            scale_features: true,
            output_dir: PathBuf::from("output"),
            host: "0.0.0.0".to_string(),
            port: 8080,
            monitor_interval_secs: 30,
            monitor_r2_threshold: 0.5,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file. A missing file falls back to the
    /// embedded defaults; a present but malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(FloodcastError::Validation(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.models.is_empty() {
            return Err(FloodcastError::Validation(
                "at least one model must be configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_target_column(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_models(mut self, models: Vec<ModelSpec>) -> Self {
        self.models = models;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringPolicy) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_column, "FloodProbability");
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.models.len(), 4);
        assert_eq!(config.models[0].kind, ModelKind::LinearRegression);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = PipelineConfig::load(Path::new("does/not/exist.json")).unwrap();
        assert_eq!(config.target_column, "FloodProbability");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        use std::io::Write;
        writeln!(file, "{{ not json").unwrap();
        assert!(PipelineConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_invalid_test_size_rejected() {
        let config = PipelineConfig::default().with_test_size(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_json() {
        let config = PipelineConfig::default().with_scoring(ScoringPolicy::Composite);
        let json = serde_json::to_string(&config).unwrap();
        let restored: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.scoring, ScoringPolicy::Composite);
        assert_eq!(restored.models.len(), config.models.len());
    }
}
