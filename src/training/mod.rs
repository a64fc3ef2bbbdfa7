//! Model training: base learners, ensembles, metrics, cross-validation

pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear;
pub mod metrics;
pub mod model;
pub mod newton_boosting;
pub mod random_forest;
pub mod trainer;

pub use cross_validation::{CvSplit, CvSummary, KFold};
pub use decision_tree::DecisionTree;
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use linear::LinearRegression;
pub use metrics::RegressionMetrics;
pub use model::{ModelKind, ModelParams, TrainedRegressor};
pub use newton_boosting::{NewtonBoostingConfig, NewtonBoostingRegressor};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use trainer::{ModelReport, Trainer, TrainingOutcome};
