//! Best-model selection

mod grid;

pub use grid::{GridSearch, ParamGrid};

use crate::error::{FloodcastError, Result};
use crate::training::{ModelKind, ModelReport, TrainedRegressor};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How candidates are ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Held-out R2, higher wins
    #[default]
    R2,
    /// Blend of accuracy and training cost:
    /// 0.7 * r2 - 0.2 * mse + 0.1 / (training_secs + 1)
    Composite,
}

impl ScoringPolicy {
    pub fn score(&self, report: &ModelReport) -> f64 {
        match self {
            ScoringPolicy::R2 => report.metrics.r2,
            ScoringPolicy::Composite => {
                0.7 * report.metrics.r2 - 0.2 * report.metrics.mse
                    + 0.1 / (report.training_secs + 1.0)
            }
        }
    }
}

/// The winning candidate
#[derive(Debug, Clone)]
pub struct Selection {
    pub name: String,
    pub kind: ModelKind,
    pub score: f64,
    pub model: TrainedRegressor,
}

/// Pick the best report under the policy. Ties keep the earlier entry, so
/// roster order acts as the tie-break. NaN scores rank below everything.
pub fn select_best(reports: &[ModelReport], policy: ScoringPolicy) -> Result<Selection> {
    let mut best: Option<(usize, f64)> = None;

    for (i, report) in reports.iter().enumerate() {
        let mut score = policy.score(report);
        if score.is_nan() {
            score = f64::NEG_INFINITY;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }

    let (idx, score) = best.ok_or(FloodcastError::NoModelsAvailable)?;
    let winner = &reports[idx];

    info!(
        model = %winner.name,
        score,
        policy = ?policy,
        "Best model selected"
    );

    Ok(Selection {
        name: winner.name.clone(),
        kind: winner.kind,
        score,
        model: winner.model.clone(),
    })
}
