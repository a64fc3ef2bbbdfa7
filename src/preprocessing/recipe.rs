//! Feature engineering recipe
//!
//! One data-driven contract for deriving interaction features, applied to
//! whole DataFrames at training time and to single keyed rows at inference
//! time. Both paths share the same arithmetic, so train and serve can never
//! drift apart.

use crate::error::{FloodcastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How two input columns are combined into a derived feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    Product,
    Sum,
}

impl Combine {
    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Combine::Product => left * right,
            Combine::Sum => left + right,
        }
    }
}

/// A derived column: a named combination of two raw columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeature {
    pub name: String,
    pub op: Combine,
    pub left: String,
    pub right: String,
}

impl DerivedFeature {
    pub fn product(name: &str, left: &str, right: &str) -> Self {
        Self {
            name: name.to_string(),
            op: Combine::Product,
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    pub fn sum(name: &str, left: &str, right: &str) -> Self {
        Self {
            name: name.to_string(),
            op: Combine::Sum,
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

/// Ordered list of derived features plus raw columns dropped afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecipe {
    pub derived: Vec<DerivedFeature>,
    pub drop: Vec<String>,
}

impl FeatureRecipe {
    /// Recipe that changes nothing.
    pub fn identity() -> Self {
        Self {
            derived: Vec::new(),
            drop: Vec::new(),
        }
    }

    /// The flood survey feature contract.
    pub fn flood_default() -> Self {
        Self {
            derived: vec![
                DerivedFeature::product("Monsoon_Drainage", "MonsoonIntensity", "TopographyDrainage"),
                DerivedFeature::product("Urban_Climate", "Urbanization", "ClimateChange"),
                DerivedFeature::sum("LandslideRisk", "TopographyDrainage", "Deforestation"),
                DerivedFeature::sum(
                    "InadequateInfrastructure",
                    "DeterioratingInfrastructure",
                    "DrainageSystems",
                ),
            ],
            drop: vec![
                "TopographyDrainage".to_string(),
                "Deforestation".to_string(),
                "DeterioratingInfrastructure".to_string(),
                "DrainageSystems".to_string(),
            ],
        }
    }

    /// Raw columns consumed as inputs by derived features, first-use order.
    pub fn inputs(&self) -> Vec<String> {
        let mut inputs: Vec<String> = Vec::new();
        for d in &self.derived {
            for col in [&d.left, &d.right] {
                if !inputs.contains(col) {
                    inputs.push(col.clone());
                }
            }
        }
        inputs
    }

    /// Apply the recipe to a whole DataFrame: append each derived column,
    /// then drop the consumed raw columns.
    pub fn apply_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();

        for d in &self.derived {
            let left = numeric_column(&out, &d.left)?;
            let right = numeric_column(&out, &d.right)?;

            let combined: Float64Chunked = left
                .into_iter()
                .zip(right.into_iter())
                .map(|(l, r)| match (l, r) {
                    (Some(l), Some(r)) => Some(d.op.apply(l, r)),
                    _ => None,
                })
                .collect();

            out.with_column(combined.with_name(d.name.as_str().into()).into_series())?;
        }

        for col in &self.drop {
            if out.column(col).is_err() {
                return Err(FloodcastError::MissingFeatureColumn(col.clone()));
            }
            out = out.drop(col)?;
        }

        Ok(out)
    }

    /// Apply the recipe to a single keyed row, bit-identical to
    /// [`FeatureRecipe::apply_frame`].
    pub fn apply_row(&self, row: &BTreeMap<String, f64>) -> Result<BTreeMap<String, f64>> {
        let mut out = row.clone();

        for d in &self.derived {
            let left = *out
                .get(&d.left)
                .ok_or_else(|| FloodcastError::MissingFeatureColumn(d.left.clone()))?;
            let right = *out
                .get(&d.right)
                .ok_or_else(|| FloodcastError::MissingFeatureColumn(d.right.clone()))?;
            out.insert(d.name.clone(), d.op.apply(left, right));
        }

        for col in &self.drop {
            if out.remove(col).is_none() {
                return Err(FloodcastError::MissingFeatureColumn(col.clone()));
            }
        }

        Ok(out)
    }
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df
        .column(name)
        .map_err(|_| FloodcastError::MissingFeatureColumn(name.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flood_frame() -> DataFrame {
        df!(
            "MonsoonIntensity" => &[2.0, 3.0],
            "TopographyDrainage" => &[4.0, 5.0],
            "Urbanization" => &[1.0, 2.0],
            "ClimateChange" => &[3.0, 3.0],
            "Deforestation" => &[1.0, 1.0],
            "DeterioratingInfrastructure" => &[2.0, 2.0],
            "DrainageSystems" => &[6.0, 7.0],
            "RiverManagement" => &[5.0, 5.0]
        )
        .unwrap()
    }

    #[test]
    fn test_flood_recipe_frame() {
        let recipe = FeatureRecipe::flood_default();
        let out = recipe.apply_frame(&flood_frame()).unwrap();

        let md = out.column("Monsoon_Drainage").unwrap().f64().unwrap();
        assert_eq!(md.get(0), Some(8.0)); // 2 * 4
        assert_eq!(md.get(1), Some(15.0)); // 3 * 5

        let lr = out.column("LandslideRisk").unwrap().f64().unwrap();
        assert_eq!(lr.get(0), Some(5.0)); // 4 + 1

        let ii = out.column("InadequateInfrastructure").unwrap().f64().unwrap();
        assert_eq!(ii.get(0), Some(8.0)); // 2 + 6

        // Consumed raw columns are gone, untouched ones stay
        assert!(out.column("TopographyDrainage").is_err());
        assert!(out.column("DrainageSystems").is_err());
        assert!(out.column("RiverManagement").is_ok());
        assert!(out.column("MonsoonIntensity").is_ok());
    }

    #[test]
    fn test_row_matches_frame() {
        let recipe = FeatureRecipe::flood_default();
        let frame_out = recipe.apply_frame(&flood_frame()).unwrap();

        let mut row = BTreeMap::new();
        for (name, value) in [
            ("MonsoonIntensity", 2.0),
            ("TopographyDrainage", 4.0),
            ("Urbanization", 1.0),
            ("ClimateChange", 3.0),
            ("Deforestation", 1.0),
            ("DeterioratingInfrastructure", 2.0),
            ("DrainageSystems", 6.0),
            ("RiverManagement", 5.0),
        ] {
            row.insert(name.to_string(), value);
        }
        let row_out = recipe.apply_row(&row).unwrap();

        for name in frame_out.get_column_names() {
            let frame_value = frame_out
                .column(name.as_str())
                .unwrap()
                .f64()
                .unwrap()
                .get(0)
                .unwrap();
            let row_value = row_out[name.as_str()];
            assert_eq!(frame_value, row_value, "column {name} diverged");
        }
        assert_eq!(row_out.len(), frame_out.width());
    }

    #[test]
    fn test_missing_input_column() {
        let recipe = FeatureRecipe::flood_default();
        let df = df!("MonsoonIntensity" => &[1.0]).unwrap();
        let err = recipe.apply_frame(&df).unwrap_err();
        assert!(matches!(
            err,
            FloodcastError::MissingFeatureColumn(c) if c == "TopographyDrainage"
        ));
    }

    #[test]
    fn test_missing_input_key_in_row() {
        let recipe = FeatureRecipe::flood_default();
        let row = BTreeMap::from([("MonsoonIntensity".to_string(), 1.0)]);
        assert!(recipe.apply_row(&row).is_err());
    }

    #[test]
    fn test_inputs_order() {
        let recipe = FeatureRecipe::flood_default();
        let inputs = recipe.inputs();
        assert_eq!(inputs[0], "MonsoonIntensity");
        assert_eq!(inputs[1], "TopographyDrainage");
        // TopographyDrainage is used twice but listed once
        assert_eq!(
            inputs.iter().filter(|c| *c == "TopographyDrainage").count(),
            1
        );
    }

    #[test]
    fn test_identity_recipe() {
        let recipe = FeatureRecipe::identity();
        let df = flood_frame();
        let out = recipe.apply_frame(&df).unwrap();
        assert_eq!(out.width(), df.width());
    }
}
