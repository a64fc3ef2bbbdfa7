//! Seeded train/test splitting

use crate::error::{FloodcastError, Result};
use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The four partitions produced by a split.
#[derive(Debug, Clone)]
pub struct SplitData {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Shuffle rows with a seeded RNG and split off `test_size` as the test
/// partition. Partitions are disjoint and together cover every input row.
pub fn train_test_split(
    x: &DataFrame,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<SplitData> {
    let n_samples = x.height();
    if n_samples != y.len() {
        return Err(FloodcastError::Shape {
            expected: format!("target length = {}", n_samples),
            actual: format!("target length = {}", y.len()),
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FloodcastError::Validation(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    if n_samples < 2 {
        return Err(FloodcastError::Validation(format!(
            "need at least 2 rows to split, got {n_samples}"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_samples as f64) * test_size).round() as usize;
    let n_test = n_test.clamp(1, n_samples - 1);

    let (test_indices, train_indices) = indices.split_at(n_test);

    Ok(SplitData {
        x_train: take_rows(x, train_indices)?,
        x_test: take_rows(x, test_indices)?,
        y_train: take_values(y, train_indices),
        y_test: take_values(y, test_indices),
    })
}

fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

fn take_values(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_vec(indices.iter().map(|&i| y[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_data(n: usize) -> (DataFrame, Array1<f64>) {
        let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let df = df!("a" => &values).unwrap();
        let y = Array1::from_vec(values);
        (df, y)
    }

    #[test]
    fn test_split_sizes() {
        let (x, y) = make_data(1000);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.x_train.height(), 800);
        assert_eq!(split.x_test.height(), 200);
        assert_eq!(split.y_train.len(), 800);
        assert_eq!(split.y_test.len(), 200);
    }

    #[test]
    fn test_split_is_deterministic() {
        let (x, y) = make_data(100);
        let a = train_test_split(&x, &y, 0.3, 7).unwrap();
        let b = train_test_split(&x, &y, 0.3, 7).unwrap();
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover() {
        let (x, y) = make_data(50);
        let split = train_test_split(&x, &y, 0.2, 3).unwrap();

        // Rows carry their original index as the value, so the partitioned
        // targets must reassemble the full index set.
        let mut all: Vec<i64> = split
            .y_train
            .iter()
            .chain(split.y_test.iter())
            .map(|&v| v as i64)
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<i64>>());
    }

    #[test]
    fn test_rows_stay_aligned_with_targets() {
        let (x, y) = make_data(30);
        let split = train_test_split(&x, &y, 0.5, 11).unwrap();
        let col = split.x_test.column("a").unwrap().f64().unwrap();
        for (i, target) in split.y_test.iter().enumerate() {
            assert_eq!(col.get(i), Some(*target));
        }
    }

    #[test]
    fn test_bad_fraction_rejected() {
        let (x, y) = make_data(10);
        assert!(train_test_split(&x, &y, 0.0, 1).is_err());
        assert!(train_test_split(&x, &y, 1.0, 1).is_err());
    }
}
