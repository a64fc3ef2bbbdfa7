//! Feature scaling

use crate::error::{FloodcastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// No scaling
    None,
}

/// Parameters for a fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: f64,
    scale: f64,
}

/// Per-column feature scaler. Fitted once on the train partition; the same
/// fitted parameters transform the test partition and live inference rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the given columns.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| FloodcastError::MissingFeatureColumn(col_name.clone()))?;
            let series = column.as_materialized_series();

            let params = self.compute_params(series)?;
            self.params.insert(col_name.clone(), params);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform fitted columns. Builds all replacement columns first, then
    /// applies them in one pass.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FloodcastError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .filter_map(|(col_name, params)| {
                df.column(col_name).ok().map(|column| {
                    let series = column.as_materialized_series();
                    self.scale_series(series, params)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result = result.with_column(scaled)?.clone();
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Transform a single keyed row in place, using the fitted parameters.
    /// Keys without fitted parameters are left untouched.
    pub fn transform_row(&self, row: &mut BTreeMap<String, f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(FloodcastError::ModelNotFitted);
        }
        for (name, params) in &self.params {
            if let Some(value) = row.get_mut(name) {
                *value = (*value - params.center) / params.scale;
            }
        }
        Ok(())
    }

    fn compute_params(&self, series: &Series) -> Result<ScalerParams> {
        let ca = series
            .cast(&DataType::Float64)?
            .f64()
            .map_err(|e| FloodcastError::Data(e.to_string()))?
            .clone();

        match self.scaler_type {
            ScalerType::Standard => {
                let mean = ca.mean().unwrap_or(0.0);
                let std = ca.std(1).unwrap_or(1.0);
                Ok(ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                })
            }
            ScalerType::None => Ok(ScalerParams {
                center: 0.0,
                scale: 1.0,
            }),
        }
    }

    fn scale_series(&self, series: &Series, params: &ScalerParams) -> Result<Series> {
        let cast = series.cast(&DataType::Float64)?;
        let ca = cast.f64().map_err(|e| FloodcastError::Data(e.to_string()))?;

        let scaled: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| (v - params.center) / params.scale))
            .collect();

        Ok(scaled.with_name(series.name().clone()).into_series())
    }
}
