//! Integration test: artifact persistence and single-row serving

use floodcast::prelude::*;
use floodcast::preprocessing::frame_to_matrix;
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

fn flood_data(n: usize) -> LoadedData {
    let col = |mult: usize, modulus: usize| -> Vec<f64> {
        (0..n).map(|i| ((i * mult) % modulus) as f64).collect()
    };
    let features = df!(
        "MonsoonIntensity" => col(3, 11),
        "TopographyDrainage" => col(5, 13),
        "Urbanization" => col(2, 7),
        "ClimateChange" => col(11, 17),
        "Deforestation" => col(7, 19),
        "DeterioratingInfrastructure" => col(13, 23),
        "DrainageSystems" => col(3, 5),
        "RiverManagement" => col(17, 29)
    )
    .unwrap();
    let target: Array1<f64> = (0..n)
        .map(|i| {
            let m = ((i * 3) % 11) as f64;
            let t = ((i * 5) % 13) as f64;
            let u = ((i * 2) % 7) as f64;
            let c = ((i * 11) % 17) as f64;
            (0.02 * m * t + 0.03 * u * c) / 10.0
        })
        .collect();
    LoadedData {
        table: features.clone(),
        features,
        target,
    }
}

/// Train a linear model on the engineered features and wrap it in an artifact.
fn trained_artifact() -> ModelArtifact {
    let data = flood_data(120);
    let prepared = Preprocessor::new(FeatureRecipe::flood_default())
        .with_seed(7)
        .run(&data)
        .unwrap();

    let x_train = frame_to_matrix(&prepared.x_train, &prepared.feature_names).unwrap();
    let model = TrainedRegressor::fit_new(
        ModelKind::LinearRegression,
        &ModelParams::default(),
        7,
        &x_train,
        &prepared.y_train,
    )
    .unwrap();

    ModelArtifact::new(
        "Linear Regression",
        model,
        prepared.scaler.clone(),
        prepared.recipe.clone(),
        prepared.feature_names.clone(),
    )
}

fn full_row() -> BTreeMap<String, f64> {
    let mut row = BTreeMap::new();
    for (name, value) in [
        ("MonsoonIntensity", 3.0),
        ("TopographyDrainage", 5.0),
        ("Urbanization", 2.0),
        ("ClimateChange", 4.0),
        ("Deforestation", 6.0),
        ("DeterioratingInfrastructure", 1.0),
        ("DrainageSystems", 2.0),
        ("RiverManagement", 8.0),
    ] {
        row.insert(name.to_string(), value);
    }
    row
}

#[test]
fn test_artifact_round_trip_preserves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let artifact = trained_artifact();
    artifact.save(&path).unwrap();
    let restored = ModelArtifact::load(&path).unwrap();

    let before = Predictor::from_artifact(&artifact)
        .predict(&full_row())
        .unwrap();
    let after = Predictor::from_artifact(&restored)
        .predict(&full_row())
        .unwrap();

    assert!(before.is_finite());
    assert_eq!(before, after);
    assert_eq!(restored.model_name, "Linear Regression");
}

#[test]
fn test_raw_schema_covers_all_survey_columns() {
    let predictor = Predictor::from_artifact(&trained_artifact());
    let schema = predictor.raw_schema();

    // Untouched raw columns plus every recipe input, no duplicates
    assert_eq!(schema.len(), 8);
    for name in [
        "MonsoonIntensity",
        "TopographyDrainage",
        "RiverManagement",
        "DrainageSystems",
    ] {
        assert!(schema.contains(&name.to_string()), "schema misses {name}");
    }
}

#[test]
fn test_missing_keys_reported_together() {
    let predictor = Predictor::from_artifact(&trained_artifact());

    let mut row = full_row();
    row.remove("MonsoonIntensity");
    row.remove("RiverManagement");

    let err = predictor.predict(&row).unwrap_err();
    match err {
        FloodcastError::SchemaMismatch(missing) => {
            assert_eq!(missing.len(), 2);
            assert!(missing.contains(&"MonsoonIntensity".to_string()));
            assert!(missing.contains(&"RiverManagement".to_string()));
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
}

#[test]
fn test_extra_keys_are_ignored() {
    let predictor = Predictor::from_artifact(&trained_artifact());

    let baseline = predictor.predict(&full_row()).unwrap();

    let mut row = full_row();
    row.insert("Unrelated".to_string(), 99.0);
    let with_extra = predictor.predict(&row).unwrap();

    assert_eq!(baseline, with_extra);
}

#[test]
fn test_pipeline_and_artifact_agree() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = trained_artifact();
    let path = dir.path().join("model.json");
    artifact.save(&path).unwrap();

    // A fresh process would load the artifact from disk; predictions must
    // match the in-memory model exactly.
    let served = Predictor::from_artifact(&ModelArtifact::load(&path).unwrap());
    let local = Predictor::from_artifact(&artifact);

    for i in 0..5 {
        let mut row = full_row();
        row.insert("MonsoonIntensity".to_string(), i as f64);
        assert_eq!(local.predict(&row).unwrap(), served.predict(&row).unwrap());
    }
}
