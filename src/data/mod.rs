//! Dataset loading

use crate::error::{FloodcastError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Retry behavior for transient read failures.
///
/// Passed to the loader explicitly so tests can inject a zero-retry policy.
/// A missing file is never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Delay before retrying after `attempt` failures, doubling each time.
    fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

/// Output of the load stage: the full table plus the feature/target split.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub table: DataFrame,
    /// Everything except the target column
    pub features: DataFrame,
    /// Target column cast to f64; nulls become NaN and are caught later
    pub target: Array1<f64>,
}

/// CSV dataset loader with an explicit retry policy.
pub struct DatasetLoader {
    target_column: String,
    retry: RetryPolicy,
}

impl DatasetLoader {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Load a CSV file and split it into features and target.
    pub fn load(&self, path: &Path) -> Result<LoadedData> {
        if !path.exists() {
            return Err(FloodcastError::DataNotFound(path.display().to_string()));
        }

        let df = self.read_with_retry(path)?;

        if df.height() == 0 {
            return Err(FloodcastError::EmptyDataset(path.display().to_string()));
        }

        if df.column(&self.target_column).is_err() {
            return Err(FloodcastError::MissingTargetColumn(
                self.target_column.clone(),
            ));
        }

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "Dataset loaded"
        );

        let target_series = df
            .column(&self.target_column)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let ca = target_series.f64()?;
        let target: Array1<f64> = ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();

        let features = df.drop(&self.target_column)?;

        Ok(LoadedData {
            table: df,
            features,
            target,
        })
    }

    /// Only transient io failures are retried; a parse error is
    /// deterministic and propagates immediately.
    fn read_with_retry(&self, path: &Path) -> Result<DataFrame> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_err: Option<FloodcastError> = None;

        for attempt in 0..attempts {
            match Self::read_csv(path) {
                Ok(df) => return Ok(df),
                Err(e @ FloodcastError::Io(_)) => {
                    if attempt + 1 < attempts {
                        let delay = self.retry.delay(attempt);
                        warn!(
                            path = %path.display(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Dataset read failed, retrying"
                        );
                        std::thread::sleep(delay);
                    }
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            FloodcastError::Data(format!("failed to read {}", path.display()))
        }))
    }

    fn read_csv(path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file)
            .finish()?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b,FloodProbability").unwrap();
        writeln!(file, "1.0,2.0,0.5").unwrap();
        writeln!(file, "3.0,4.0,0.6").unwrap();
        writeln!(file, "5.0,6.0,0.7").unwrap();
        file
    }

    #[test]
    fn test_load_splits_features_and_target() {
        let file = create_test_csv();
        let loader = DatasetLoader::new("FloodProbability");

        let data = loader.load(file.path()).unwrap();

        assert_eq!(data.table.height(), 3);
        assert_eq!(data.features.width(), 2);
        assert_eq!(data.target.len(), 3);
        assert!((data.target[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_is_data_not_found() {
        let loader = DatasetLoader::new("FloodProbability").with_retry(RetryPolicy::none());
        let err = loader.load(Path::new("no/such/file.csv")).unwrap_err();
        assert!(matches!(err, FloodcastError::DataNotFound(_)));
    }

    #[test]
    fn test_missing_target_column() {
        let file = create_test_csv();
        let loader = DatasetLoader::new("NotAColumn").with_retry(RetryPolicy::none());
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, FloodcastError::MissingTargetColumn(c) if c == "NotAColumn"));
    }

    #[test]
    fn test_empty_dataset() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b,FloodProbability").unwrap();
        let loader = DatasetLoader::new("FloodProbability").with_retry(RetryPolicy::none());
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, FloodcastError::EmptyDataset(_)));
    }

    #[test]
    fn test_parse_error_is_not_retried() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b,FloodProbability").unwrap();
        writeln!(file, "1.0,2.0,0.5,9.0,9.0").unwrap();

        // Retrying a deterministic parse failure would sleep for minutes
        let loader = DatasetLoader::new("FloodProbability").with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 60_000,
        });
        let start = std::time::Instant::now();
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, FloodcastError::Polars(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_zero_retry_policy_single_attempt() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay(0), Duration::from_millis(0));
    }

    #[test]
    fn test_retry_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }
}
