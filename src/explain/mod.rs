//! Model explanations: per-feature importance scores for any trained model

use crate::error::Result;
use crate::training::{ModelKind, RegressionMetrics, TrainedRegressor};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Coarse grouping that decides which explanation strategy applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Linear,
    TreeEnsemble,
    Other,
}

impl From<ModelKind> for ModelFamily {
    fn from(kind: ModelKind) -> Self {
        match kind {
            ModelKind::LinearRegression => ModelFamily::Linear,
            ModelKind::RandomForest | ModelKind::GradientBoosting | ModelKind::NewtonBoosting => {
                ModelFamily::TreeEnsemble
            }
        }
    }
}

/// Model-agnostic importance: shuffle one column at a time and measure the
/// mean R2 drop over several repeats.
pub struct PermutationImportance {
    pub n_repeats: usize,
    pub seed: u64,
}

impl Default for PermutationImportance {
    fn default() -> Self {
        Self {
            n_repeats: 5,
            seed: 42,
        }
    }
}

impl PermutationImportance {
    pub fn new(n_repeats: usize, seed: u64) -> Self {
        Self { n_repeats, seed }
    }

    pub fn compute(
        &self,
        model: &TrainedRegressor,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        let baseline = {
            let y_pred = model.predict(x)?;
            RegressionMetrics::compute(y, &y_pred).r2
        };

        let n_features = x.ncols();
        let mut importances = Array1::zeros(n_features);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        for j in 0..n_features {
            let mut drop_sum = 0.0;
            for _ in 0..self.n_repeats {
                let mut x_perm = x.clone();
                let mut column: Vec<f64> = x.column(j).to_vec();
                column.shuffle(&mut rng);
                for (i, v) in column.into_iter().enumerate() {
                    x_perm[[i, j]] = v;
                }

                let y_pred = model.predict(&x_perm)?;
                let r2 = RegressionMetrics::compute(y, &y_pred).r2;
                drop_sum += baseline - r2;
            }
            // A shuffled column can score better by chance; floor at zero
            importances[j] = (drop_sum / self.n_repeats as f64).max(0.0);
        }

        Ok(importances)
    }
}

/// Explain a trained model as named, non-negative importance scores in
/// feature order. Tree ensembles and linear models use their native
/// importances; anything else falls back to permutation importance.
pub fn feature_importance(
    model: &TrainedRegressor,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    feature_names: &[String],
    seed: u64,
) -> Result<Vec<(String, f64)>> {
    let family = ModelFamily::from(model.kind());

    let scores = match model.feature_importances() {
        Some(native) if native.len() == feature_names.len() => native,
        _ => PermutationImportance::new(5, seed).compute(model, x_test, y_test)?,
    };

    let mut pairs: Vec<(String, f64)> = feature_names
        .iter()
        .cloned()
        .zip(scores.iter().map(|&v| v.max(0.0)))
        .collect();
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    info!(
        model = %model.kind(),
        family = ?family,
        top = pairs.first().map(|(name, _)| name.as_str()).unwrap_or(""),
        "Feature importance computed"
    );

    Ok(pairs)
}
