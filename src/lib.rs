//! Floodcast - Flood Probability Prediction Pipeline
//!
//! A tabular regression pipeline that loads flood survey data, engineers
//! interaction features, trains several regression models, selects the best
//! one, explains and monitors it, and serves predictions through a web
//! dashboard.
//!
//! # Architecture
//!
//! The pipeline is strictly linear. Each stage is a function over immutable
//! data transfer structs; the orchestrator in [`pipeline`] threads them:
//!
//! ```text
//! load -> preprocess -> train -> select/tune -> explain -> visualize
//!      -> monitor -> persist -> predict sample -> (serve)
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod explain;
pub mod inference;
pub mod monitoring;
pub mod persist;
pub mod pipeline;
pub mod preprocessing;
pub mod selection;
pub mod server;
pub mod training;
pub mod visualization;

pub mod cli;

pub use error::{FloodcastError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::config::{ModelSpec, PipelineConfig};
    pub use crate::data::{DatasetLoader, LoadedData, RetryPolicy};
    pub use crate::error::{FloodcastError, Result};
    pub use crate::explain::ModelFamily;
    pub use crate::inference::Predictor;
    pub use crate::monitoring::MonitorLog;
    pub use crate::persist::ModelArtifact;
    pub use crate::pipeline::{Pipeline, PipelineRun};
    pub use crate::preprocessing::{FeatureRecipe, PreparedData, Preprocessor, Scaler, ScalerType};
    pub use crate::selection::{select_best, ScoringPolicy, Selection};
    pub use crate::training::{
        ModelKind, ModelParams, ModelReport, RegressionMetrics, TrainedRegressor, Trainer,
        TrainingOutcome,
    };
}
