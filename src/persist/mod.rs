//! Model persistence: the trained model plus the full preprocessing state
//! in one JSON artifact

use crate::error::{FloodcastError, Result};
use crate::preprocessing::{FeatureRecipe, Scaler};
use crate::training::TrainedRegressor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Everything needed to reproduce train-time predictions at serve time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub created_at: DateTime<Utc>,
    pub model_name: String,
    pub model: TrainedRegressor,
    pub scaler: Option<Scaler>,
    pub recipe: FeatureRecipe,
    /// Engineered column order the model was trained on
    pub feature_names: Vec<String>,
}

impl ModelArtifact {
    pub fn new(
        model_name: impl Into<String>,
        model: TrainedRegressor,
        scaler: Option<Scaler>,
        recipe: FeatureRecipe,
        feature_names: Vec<String>,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            model_name: model_name.into(),
            model,
            scaler,
            recipe,
            feature_names,
        }
    }

    /// Write atomically: serialize to a temp file in the same directory,
    /// then rename over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FloodcastError::Persistence(format!("create {parent:?}: {e}")))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FloodcastError::Persistence(format!("serialize artifact: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| FloodcastError::Persistence(format!("write {tmp:?}: {e}")))?;
        fs::rename(&tmp, path)
            .map_err(|e| FloodcastError::Persistence(format!("rename to {path:?}: {e}")))?;

        info!(path = %path.display(), model = %self.model_name, "Artifact saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| FloodcastError::Persistence(format!("read {path:?}: {e}")))?;
        let artifact: Self = serde_json::from_str(&json)
            .map_err(|e| FloodcastError::Persistence(format!("parse {path:?}: {e}")))?;

        info!(
            path = %path.display(),
            model = %artifact.model_name,
            created_at = %artifact.created_at,
            "Artifact loaded"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ModelKind, ModelParams, TrainedRegressor};
    use ndarray::array;

    fn artifact_fixture() -> ModelArtifact {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let model = TrainedRegressor::fit_new(
            ModelKind::LinearRegression,
            &ModelParams::default(),
            42,
            &x,
            &y,
        )
        .unwrap();
        ModelArtifact::new(
            "Linear Regression",
            model,
            None,
            FeatureRecipe::identity(),
            vec!["a".to_string()],
        )
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let artifact = artifact_fixture();
        artifact.save(&path).unwrap();
        assert!(path.exists());

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.model_name, artifact.model_name);
        assert_eq!(loaded.feature_names, artifact.feature_names);

        // Predictions survive the round trip
        let x = array![[5.0]];
        let before = artifact.model.predict(&x).unwrap();
        let after = loaded.model.predict(&x).unwrap();
        assert!((before[0] - after[0]).abs() < 1e-12);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        artifact_fixture().save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = ModelArtifact::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, FloodcastError::Persistence(_)));
    }
}
