//! Post-deployment model monitoring

use crate::error::Result;
use crate::training::{RegressionMetrics, TrainedRegressor};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One monitoring observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub r2: f64,
    pub mse: f64,
}

/// Append-only log of evaluation samples against a reference dataset.
/// A score under the threshold is warned about, never treated as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorLog {
    threshold: f64,
    samples: Vec<MetricSample>,
}

impl MonitorLog {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            samples: Vec::new(),
        }
    }

    /// Score the model on the reference data and append the sample.
    pub fn observe(
        &mut self,
        model: &TrainedRegressor,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<MetricSample> {
        let y_pred = model.predict(x)?;
        let metrics = RegressionMetrics::compute(y, &y_pred);

        let sample = MetricSample {
            timestamp: Utc::now(),
            r2: metrics.r2,
            mse: metrics.mse,
        };

        if sample.r2 < self.threshold {
            warn!(
                r2 = sample.r2,
                threshold = self.threshold,
                "Model performance below threshold"
            );
        } else {
            info!(r2 = sample.r2, mse = sample.mse, "Monitor sample recorded");
        }

        self.samples.push(sample);
        Ok(sample)
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ModelKind, ModelParams};
    use ndarray::array;

    fn fitted_model() -> (TrainedRegressor, Array2<f64>, Array1<f64>) {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0];
        let model = TrainedRegressor::fit_new(
            ModelKind::LinearRegression,
            &ModelParams::default(),
            42,
            &x,
            &y,
        )
        .unwrap();
        (model, x, y)
    }

    #[test]
    fn test_observe_appends_samples() {
        let (model, x, y) = fitted_model();
        let mut log = MonitorLog::new(0.5);

        log.observe(&model, &x, &y).unwrap();
        log.observe(&model, &x, &y).unwrap();

        assert_eq!(log.samples().len(), 2);
        assert!(log.latest().unwrap().r2 > 0.99);
    }

    #[test]
    fn test_below_threshold_does_not_error() {
        let (model, x, _) = fitted_model();
        // Targets unrelated to the fit push R2 below any threshold
        let bad_y = array![10.0, -3.0, 7.0, 0.0, -8.0];
        let mut log = MonitorLog::new(0.5);

        let sample = log.observe(&model, &x, &bad_y).unwrap();
        assert!(sample.r2 < 0.5);
        assert_eq!(log.samples().len(), 1);
    }
}
