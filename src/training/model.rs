//! Model roster: kinds, hyperparameters, and the unified regressor enum

use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::linear::LinearRegression;
use super::newton_boosting::{NewtonBoostingConfig, NewtonBoostingRegressor};
use super::random_forest::{MaxFeatures, RandomForestRegressor};
use crate::error::{FloodcastError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The trainable model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LinearRegression,
    RandomForest,
    GradientBoosting,
    NewtonBoosting,
}

impl ModelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::NewtonBoosting => "Newton Boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Hyperparameters shared across the roster. Unset fields fall back to each
/// model's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub n_estimators: Option<usize>,
    pub max_depth: Option<usize>,
    pub learning_rate: Option<f64>,
    pub min_samples_leaf: Option<usize>,
    pub subsample: Option<f64>,
    pub reg_lambda: Option<f64>,
}

impl ModelParams {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
        self
    }
}

/// A fitted regressor of any kind behind one interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedRegressor {
    Linear(LinearRegression),
    Forest(RandomForestRegressor),
    Boosted(GradientBoostingRegressor),
    Newton(NewtonBoostingRegressor),
}

impl TrainedRegressor {
    /// Build and fit a fresh model of the given kind. Fit failures are
    /// reported with the model name attached.
    pub fn fit_new(
        kind: ModelKind,
        params: &ModelParams,
        seed: u64,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<Self> {
        let wrap = |e: FloodcastError| FloodcastError::ModelFit {
            model: kind.display_name().to_string(),
            reason: e.to_string(),
        };

        match kind {
            ModelKind::LinearRegression => {
                let mut model = LinearRegression::new();
                if let Some(lambda) = params.reg_lambda {
                    model = model.with_alpha(lambda);
                }
                model.fit(x, y).map_err(wrap)?;
                Ok(TrainedRegressor::Linear(model))
            }
            ModelKind::RandomForest => {
                let mut model = RandomForestRegressor::new(params.n_estimators.unwrap_or(100))
                    .with_random_state(seed)
                    .with_max_features(MaxFeatures::Sqrt);
                if let Some(depth) = params.max_depth {
                    model = model.with_max_depth(depth);
                }
                if let Some(leaf) = params.min_samples_leaf {
                    model = model.with_min_samples_leaf(leaf);
                }
                model.fit(x, y).map_err(wrap)?;
                Ok(TrainedRegressor::Forest(model))
            }
            ModelKind::GradientBoosting => {
                let mut config = GradientBoostingConfig {
                    random_state: Some(seed),
                    ..Default::default()
                };
                if let Some(n) = params.n_estimators {
                    config.n_estimators = n;
                }
                if let Some(depth) = params.max_depth {
                    config.max_depth = depth;
                }
                if let Some(lr) = params.learning_rate {
                    config.learning_rate = lr;
                }
                if let Some(leaf) = params.min_samples_leaf {
                    config.min_samples_leaf = leaf;
                }
                if let Some(sub) = params.subsample {
                    config.subsample = sub;
                }
                let mut model = GradientBoostingRegressor::new(config);
                model.fit(x, y).map_err(wrap)?;
                Ok(TrainedRegressor::Boosted(model))
            }
            ModelKind::NewtonBoosting => {
                let mut config = NewtonBoostingConfig {
                    random_state: Some(seed),
                    ..Default::default()
                };
                if let Some(n) = params.n_estimators {
                    config.n_estimators = n;
                }
                if let Some(depth) = params.max_depth {
                    config.max_depth = depth;
                }
                if let Some(lr) = params.learning_rate {
                    config.learning_rate = lr;
                }
                if let Some(sub) = params.subsample {
                    config.subsample = sub;
                }
                if let Some(lambda) = params.reg_lambda {
                    config.reg_lambda = lambda;
                }
                let mut model = NewtonBoostingRegressor::new(config);
                model.fit(x, y).map_err(wrap)?;
                Ok(TrainedRegressor::Newton(model))
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedRegressor::Linear(_) => ModelKind::LinearRegression,
            TrainedRegressor::Forest(_) => ModelKind::RandomForest,
            TrainedRegressor::Boosted(_) => ModelKind::GradientBoosting,
            TrainedRegressor::Newton(_) => ModelKind::NewtonBoosting,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedRegressor::Linear(m) => m.predict(x),
            TrainedRegressor::Forest(m) => m.predict(x),
            TrainedRegressor::Boosted(m) => m.predict(x),
            TrainedRegressor::Newton(m) => m.predict(x),
        }
    }

    /// Native importances where the model has them. Linear models expose
    /// absolute coefficient magnitudes.
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            TrainedRegressor::Linear(m) => m.coefficients().map(|c| c.mapv(f64::abs)),
            TrainedRegressor::Forest(m) => m.feature_importances().cloned(),
            TrainedRegressor::Boosted(m) => {
                Some(Array1::from_vec(m.feature_importances().to_vec()))
            }
            TrainedRegressor::Newton(m) => m.feature_importances(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_data() -> (Array2<f64>, Array1<f64>) {
        let x =
            Array2::from_shape_vec((40, 2), (0..80).map(|i| i as f64 * 0.25).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| 3.0 * r[0] - r[1] + 2.0)
            .collect();
        (x, y)
    }

    #[test]
    fn test_every_kind_fits_and_predicts() {
        let (x, y) = ramp_data();
        let params = ModelParams::default().with_n_estimators(10).with_max_depth(3);

        for kind in [
            ModelKind::LinearRegression,
            ModelKind::RandomForest,
            ModelKind::GradientBoosting,
            ModelKind::NewtonBoosting,
        ] {
            let model = TrainedRegressor::fit_new(kind, &params, 42, &x, &y).unwrap();
            assert_eq!(model.kind(), kind);
            let preds = model.predict(&x).unwrap();
            assert_eq!(preds.len(), x.nrows());
            assert!(preds.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_linear_importances_are_coefficients() {
        let (x, y) = ramp_data();
        let model = TrainedRegressor::fit_new(
            ModelKind::LinearRegression,
            &ModelParams::default(),
            42,
            &x,
            &y,
        )
        .unwrap();
        let imp = model.feature_importances().unwrap();
        assert_eq!(imp.len(), 2);
        assert!(imp.iter().all(|&v| v >= 0.0));
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_kind_serde_snake_case() {
        let json = serde_json::to_string(&ModelKind::NewtonBoosting).unwrap();
        assert_eq!(json, "\"newton_boosting\"");
        let back: ModelKind = serde_json::from_str("\"random_forest\"").unwrap();
        assert_eq!(back, ModelKind::RandomForest);
    }
}
