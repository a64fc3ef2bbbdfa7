//! Single-row inference through the exact train-time preprocessing path

use crate::error::{FloodcastError, Result};
use crate::persist::ModelArtifact;
use crate::preprocessing::{FeatureRecipe, Scaler};
use crate::training::TrainedRegressor;
use ndarray::Array2;
use std::collections::BTreeMap;

/// Wraps a trained model with its recipe and scaler so a raw keyed row goes
/// through the same transformations the training frame did.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: TrainedRegressor,
    scaler: Option<Scaler>,
    recipe: FeatureRecipe,
    /// Engineered column order expected by the model
    feature_names: Vec<String>,
    /// Raw input keys callers must provide
    raw_schema: Vec<String>,
}

impl Predictor {
    pub fn new(
        model: TrainedRegressor,
        scaler: Option<Scaler>,
        recipe: FeatureRecipe,
        feature_names: Vec<String>,
    ) -> Self {
        let raw_schema = compute_raw_schema(&recipe, &feature_names);
        Self {
            model,
            scaler,
            recipe,
            feature_names,
            raw_schema,
        }
    }

    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        Self::new(
            artifact.model.clone(),
            artifact.scaler.clone(),
            artifact.recipe.clone(),
            artifact.feature_names.clone(),
        )
    }

    /// The raw column names a caller must supply
    pub fn raw_schema(&self) -> &[String] {
        &self.raw_schema
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn model(&self) -> &TrainedRegressor {
        &self.model
    }

    /// Predict from one raw keyed row. Missing keys are reported together
    /// in a schema error; extra keys are ignored.
    pub fn predict(&self, raw: &BTreeMap<String, f64>) -> Result<f64> {
        let missing: Vec<String> = self
            .raw_schema
            .iter()
            .filter(|name| !raw.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(FloodcastError::SchemaMismatch(missing));
        }

        let mut row = self.recipe.apply_row(raw)?;
        if let Some(scaler) = &self.scaler {
            scaler.transform_row(&mut row)?;
        }

        let mut values = Vec::with_capacity(self.feature_names.len());
        for name in &self.feature_names {
            let v = row
                .get(name)
                .copied()
                .ok_or_else(|| FloodcastError::MissingFeatureColumn(name.clone()))?;
            values.push(v);
        }

        let x = Array2::from_shape_vec((1, values.len()), values).map_err(|e| {
            FloodcastError::Shape {
                expected: format!("1 x {}", self.feature_names.len()),
                actual: e.to_string(),
            }
        })?;

        let predictions = self.model.predict(&x)?;
        Ok(predictions[0])
    }
}

/// Raw inputs are the engineered columns that are not derived, plus every
/// input the derived features consume, in first-use order.
fn compute_raw_schema(recipe: &FeatureRecipe, feature_names: &[String]) -> Vec<String> {
    let derived_names: Vec<&str> = recipe.derived.iter().map(|d| d.name.as_str()).collect();

    let mut schema: Vec<String> = feature_names
        .iter()
        .filter(|name| !derived_names.contains(&name.as_str()))
        .cloned()
        .collect();

    for input in recipe.inputs() {
        if !schema.contains(&input) {
            schema.push(input);
        }
    }

    schema
}
