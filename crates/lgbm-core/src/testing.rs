//! Synthetic data for tests and benchmarks.

use ndarray::{Array2, s};
use rand::prelude::*;

use crate::config::DatasetConfig;
use crate::data::{Dataset, DatasetError, NumericSlice};

/// Random row-major features, uniform in `[min, max]`.
pub fn random_features(rows: usize, cols: usize, seed: u64, min: f64, max: f64) -> Array2<f64> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    Array2::from_shape_fn((rows, cols), |_| min + rng.r#gen::<f64>() * width)
}

/// Linear targets with uniform noise.
///
/// Returns `(features, targets)`.
pub fn regression(rows: usize, cols: usize, seed: u64, noise: f64) -> (Array2<f64>, Vec<f32>) {
    let features = random_features(rows, cols, seed, -1.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    let weights: Vec<f64> = (0..cols).map(|_| rng.r#gen::<f64>() * 2.0 - 1.0).collect();

    let targets = features
        .rows()
        .into_iter()
        .map(|row| {
            let y: f64 = row.iter().zip(&weights).map(|(x, w)| x * w).sum();
            (y + (rng.r#gen::<f64>() * 2.0 - 1.0) * noise) as f32
        })
        .collect();
    (features, targets)
}

/// Labels in `{0, 1}` from the sign of a noisy linear score.
///
/// Feature 0 always carries the strongest weight so small models can
/// separate the classes.
pub fn binary_classification(rows: usize, cols: usize, seed: u64) -> (Array2<f64>, Vec<f32>) {
    let (features, scores) = regression(rows, cols, seed, 0.3);
    let labels = features
        .column(0)
        .iter()
        .zip(scores)
        .map(|(&x0, s)| if 2.0 * x0 + s as f64 > 0.0 { 1.0 } else { 0.0 })
        .collect();
    (features, labels)
}

/// Split one draw into leading training rows and trailing test rows.
///
/// Both halves share the labelling rule, unlike two draws with different seeds.
pub fn train_test_split(
    features: &Array2<f64>,
    labels: &[f32],
    n_train: usize,
) -> ((Array2<f64>, Vec<f32>), (Array2<f64>, Vec<f32>)) {
    assert_eq!(features.nrows(), labels.len());
    assert!(n_train <= labels.len());
    let train = features.slice(s![..n_train, ..]).to_owned();
    let test = features.slice(s![n_train.., ..]).to_owned();
    (
        (train, labels[..n_train].to_vec()),
        (test, labels[n_train..].to_vec()),
    )
}

/// Bin a row-major feature matrix.
pub fn dense_dataset(
    features: &Array2<f64>,
    config: &DatasetConfig,
    reference: Option<&Dataset>,
) -> Result<Dataset, DatasetError> {
    let flat: Vec<f64> = features.iter().copied().collect();
    Dataset::from_dense(
        NumericSlice::F64(&flat),
        features.nrows(),
        features.ncols(),
        true,
        config,
        reference,
    )
}

/// Write `features` as a tab-separated file with the label in column 0.
pub fn to_tsv(features: &Array2<f64>, labels: &[f32]) -> String {
    assert_eq!(features.nrows(), labels.len());
    let mut out = String::new();
    for (row, label) in features.rows().into_iter().zip(labels) {
        out.push_str(&label.to_string());
        for v in row {
            out.push('\t');
            out.push_str(&v.to_string());
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_deterministic() {
        let (a, la) = binary_classification(50, 3, 42);
        let (b, lb) = binary_classification(50, 3, 42);
        assert_eq!(a, b);
        assert_eq!(la, lb);
        assert!(la.iter().all(|&l| l == 0.0 || l == 1.0));
        assert!(la.iter().any(|&l| l == 1.0) && la.iter().any(|&l| l == 0.0));
    }

    #[test]
    fn split_keeps_row_order() {
        let (x, y) = binary_classification(30, 2, 3);
        let ((train_x, train_y), (test_x, test_y)) = train_test_split(&x, &y, 20);
        assert_eq!(train_x.nrows(), 20);
        assert_eq!(test_x.nrows(), 10);
        assert_eq!(train_x.row(0), x.row(0));
        assert_eq!(test_x.row(0), x.row(20));
        assert_eq!([train_y, test_y].concat(), y);
    }

    #[test]
    fn tsv_layout() {
        let features = ndarray::array![[0.5, 1.0], [2.0, -1.0]];
        assert_eq!(to_tsv(&features, &[1.0, 0.0]), "1\t0.5\t1\n0\t2\t-1\n");
    }
}
