//! Preprocessing: feature engineering, splitting, scaling

mod recipe;
mod scaler;
mod split;

pub use recipe::{Combine, DerivedFeature, FeatureRecipe};
pub use scaler::{Scaler, ScalerType};
pub use split::{train_test_split, SplitData};

use crate::data::LoadedData;
use crate::error::{FloodcastError, Result};
use ndarray::Array2;
use polars::prelude::*;
use tracing::info;

/// Output of the preprocessing stage. `feature_names` is the canonical
/// engineered column order; every downstream matrix is built in that order.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: ndarray::Array1<f64>,
    pub y_test: ndarray::Array1<f64>,
    pub scaler: Option<Scaler>,
    pub recipe: FeatureRecipe,
    pub feature_names: Vec<String>,
}

/// Runs the recipe, split, null check, and scaling in order.
pub struct Preprocessor {
    recipe: FeatureRecipe,
    scaler_type: ScalerType,
    test_size: f64,
    seed: u64,
}

impl Preprocessor {
    pub fn new(recipe: FeatureRecipe) -> Self {
        Self {
            recipe,
            scaler_type: ScalerType::Standard,
            test_size: 0.2,
            seed: 42,
        }
    }

    pub fn with_scaler(mut self, scaler_type: ScalerType) -> Self {
        self.scaler_type = scaler_type;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn run(&self, data: &LoadedData) -> Result<PreparedData> {
        let engineered = self.recipe.apply_frame(&data.features)?;
        let feature_names: Vec<String> = engineered
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if data.target.iter().any(|v| v.is_nan()) {
            return Err(FloodcastError::NullValuesPresent("target column".to_string()));
        }

        let split = train_test_split(&engineered, &data.target, self.test_size, self.seed)?;

        check_no_nulls(&split.x_train, "train partition")?;
        check_no_nulls(&split.x_test, "test partition")?;

        let (x_train, x_test, scaler) = match self.scaler_type {
            ScalerType::None => (split.x_train, split.x_test, None),
            scaler_type => {
                let mut scaler = Scaler::new(scaler_type);
                let x_train = scaler.fit_transform(&split.x_train, &feature_names)?;
                let x_test = scaler.transform(&split.x_test)?;
                (x_train, x_test, Some(scaler))
            }
        };

        info!(
            train_rows = x_train.height(),
            test_rows = x_test.height(),
            features = feature_names.len(),
            "Preprocessing complete"
        );

        Ok(PreparedData {
            x_train,
            x_test,
            y_train: split.y_train,
            y_test: split.y_test,
            scaler,
            recipe: self.recipe.clone(),
            feature_names,
        })
    }
}

fn check_no_nulls(df: &DataFrame, partition: &str) -> Result<()> {
    for column in df.get_columns() {
        if column.null_count() > 0 {
            return Err(FloodcastError::NullValuesPresent(format!(
                "{partition}, column '{}'",
                column.name()
            )));
        }
    }
    Ok(())
}

/// Build a row-major f64 matrix from the named columns, in the given order.
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let mut series = Vec::with_capacity(columns.len());
    for name in columns {
        let s = df
            .column(name.as_str())
            .map_err(|_| FloodcastError::MissingFeatureColumn(name.clone()))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        series.push(s);
    }
    let chunked = series
        .iter()
        .map(|s| s.f64())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Array2::from_shape_fn((n_rows, columns.len()), |(i, j)| {
        chunked[j].get(i).unwrap_or(0.0)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn flood_data(n: usize) -> LoadedData {
        let ramp: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let alt: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
        let features = df!(
            "MonsoonIntensity" => &ramp,
            "TopographyDrainage" => &alt,
            "Urbanization" => &ramp,
            "ClimateChange" => &alt,
            "Deforestation" => &ramp,
            "DeterioratingInfrastructure" => &alt,
            "DrainageSystems" => &ramp,
            "RiverManagement" => &alt
        )
        .unwrap();
        let target: Array1<f64> = (0..n).map(|i| (i as f64) / (n as f64)).collect();
        LoadedData {
            table: features.clone(),
            features,
            target,
        }
    }

    #[test]
    fn test_run_produces_engineered_partitions() {
        let data = flood_data(100);
        let prepared = Preprocessor::new(FeatureRecipe::flood_default())
            .with_test_size(0.2)
            .with_seed(42)
            .run(&data)
            .unwrap();

        assert_eq!(prepared.x_train.height(), 80);
        assert_eq!(prepared.x_test.height(), 20);
        // 8 raw - 4 dropped + 4 derived
        assert_eq!(prepared.feature_names.len(), 8);
        assert!(prepared
            .feature_names
            .contains(&"Monsoon_Drainage".to_string()));
        assert!(!prepared
            .feature_names
            .contains(&"TopographyDrainage".to_string()));

        // Train and test carry identical column sets in identical order
        let train_cols: Vec<String> = prepared
            .x_train
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let test_cols: Vec<String> = prepared
            .x_test
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(train_cols, test_cols);
        assert_eq!(train_cols, prepared.feature_names);
    }

    #[test]
    fn test_nan_target_rejected() {
        let mut data = flood_data(20);
        data.target[3] = f64::NAN;
        let err = Preprocessor::new(FeatureRecipe::flood_default())
            .run(&data)
            .unwrap_err();
        assert!(matches!(err, FloodcastError::NullValuesPresent(_)));
    }

    #[test]
    fn test_frame_to_matrix_preserves_order() {
        let df = df!("b" => &[1.0, 2.0], "a" => &[3.0, 4.0]).unwrap();
        let m = frame_to_matrix(&df, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(m[[0, 0]], 3.0);
        assert_eq!(m[[0, 1]], 1.0);
        assert_eq!(m.dim(), (2, 2));
    }

    #[test]
    fn test_no_scaling_option() {
        let data = flood_data(50);
        let prepared = Preprocessor::new(FeatureRecipe::flood_default())
            .with_scaler(ScalerType::None)
            .run(&data)
            .unwrap();
        assert!(prepared.scaler.is_none());
    }
}
