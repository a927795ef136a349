//! Every ingestion path bins the same data the same way.

use lgbm_core::data::NumericSlice;
use lgbm_core::{Dataset, DatasetConfig, ErrorKind, Params, testing};
use ndarray::Array2;
use proptest::prelude::*;

const ROWS: usize = 100;
const COLS: usize = 28;

fn config() -> DatasetConfig {
    DatasetConfig::from_params(&Params::parse("max_bin=15").unwrap()).unwrap()
}

/// Random features with roughly a third of the entries zeroed, so sparse
/// inputs really are sparse.
fn features() -> Array2<f64> {
    let mut features = testing::random_features(ROWS, COLS, 3, -2.0, 2.0);
    for ((r, c), v) in features.indexed_iter_mut() {
        if (r * 7 + c * 3) % 3 == 0 {
            *v = 0.0;
        }
    }
    features
}

fn to_csr(features: &Array2<f64>) -> (Vec<i32>, Vec<i32>, Vec<f64>) {
    let mut indptr = vec![0i32];
    let (mut indices, mut data) = (Vec::new(), Vec::new());
    for row in features.rows() {
        for (c, &v) in row.iter().enumerate() {
            if v != 0.0 {
                indices.push(c as i32);
                data.push(v);
            }
        }
        indptr.push(indices.len() as i32);
    }
    (indptr, indices, data)
}

fn to_csc(features: &Array2<f64>) -> (Vec<i64>, Vec<i32>, Vec<f64>) {
    let mut col_ptr = vec![0i64];
    let (mut indices, mut data) = (Vec::new(), Vec::new());
    for col in features.columns() {
        for (r, &v) in col.iter().enumerate() {
            if v != 0.0 {
                indices.push(r as i32);
                data.push(v);
            }
        }
        col_ptr.push(indices.len() as i64);
    }
    (col_ptr, indices, data)
}

fn assert_same_bins(a: &Dataset, b: &Dataset) {
    assert_eq!(a.num_data(), b.num_data());
    assert_eq!(a.num_feature(), b.num_feature());
    assert_eq!(**a.bin_table(), **b.bin_table());
    for f in 0..a.num_feature() {
        assert_eq!(a.column(f), b.column(f), "feature {f}");
    }
}

#[test]
fn all_paths_agree() {
    let features = features();
    let labels: Vec<f32> = (0..ROWS).map(|i| (i % 2) as f32).collect();
    let config = config();

    let dense = testing::dense_dataset(&features, &config, None).unwrap();

    let column_major: Vec<f64> = features.t().iter().copied().collect();
    let dense_cm =
        Dataset::from_dense(NumericSlice::F64(&column_major), ROWS, COLS, false, &config, None).unwrap();

    let (indptr, indices, data) = to_csr(&features);
    let csr = Dataset::from_csr(
        NumericSlice::I32(&indptr),
        &indices,
        NumericSlice::F64(&data),
        COLS,
        &config,
        None,
    )
    .unwrap();

    let (col_ptr, indices, data) = to_csc(&features);
    let csc = Dataset::from_csc(
        NumericSlice::I64(&col_ptr),
        &indices,
        NumericSlice::F64(&data),
        ROWS,
        &config,
        None,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.tsv");
    std::fs::write(&path, testing::to_tsv(&features, &labels)).unwrap();
    let file = Dataset::from_file(&path, &config, None).unwrap();
    assert_eq!(file.label().unwrap(), labels.as_slice());

    for other in [&dense_cm, &csr, &csc, &file] {
        assert_same_bins(&dense, other);
    }
    assert!(dense.bin_table().mappers().iter().all(|m| m.n_bins() <= 15));
}

#[test]
fn label_length_must_match_rows() {
    let features = testing::random_features(ROWS, COLS, 1, 0.0, 1.0);
    let mut dataset = testing::dense_dataset(&features, &config(), None).unwrap();

    let labels = vec![1.0f32; ROWS];
    dataset.set_field("label", NumericSlice::F32(&labels)).unwrap();

    let short = vec![0.0f32; ROWS - 1];
    let err = dataset.set_field("label", NumericSlice::F32(&short)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(dataset.label().unwrap(), labels.as_slice());
}

#[test]
fn binary_snapshot_round_trip() {
    let features = features();
    let mut dataset = testing::dense_dataset(&features, &config(), None).unwrap();
    let labels: Vec<f32> = (0..ROWS).map(|i| (i % 3 == 0) as u8 as f32).collect();
    let weights: Vec<f32> = (0..ROWS).map(|i| 0.5 + i as f32 / 100.0).collect();
    dataset.set_field("label", NumericSlice::F32(&labels)).unwrap();
    dataset.set_field("weight", NumericSlice::F32(&weights)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.bin");
    dataset.save_binary(&path).unwrap();
    let loaded = Dataset::load_binary(&path).unwrap();

    assert_same_bins(&dataset, &loaded);
    assert_eq!(loaded.label(), dataset.label());
    assert_eq!(loaded.weight(), dataset.weight());
    assert_eq!(loaded.feature_names(), dataset.feature_names());
}

#[test]
fn corrupt_snapshot_is_malformed() {
    let features = features();
    let dataset = testing::dense_dataset(&features, &config(), None).unwrap();
    let mut bytes = dataset.to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    assert_eq!(Dataset::from_bytes(&bytes).unwrap_err().kind(), ErrorKind::MalformedInput);
    assert_eq!(Dataset::from_bytes(b"LGBD").unwrap_err().kind(), ErrorKind::MalformedInput);
    assert_eq!(
        Dataset::from_bytes(&[0u8; 64]).unwrap_err().kind(),
        ErrorKind::MalformedInput
    );
}

#[test]
fn unknown_dataset_parameter_is_configuration_error() {
    let err = Params::parse("max_bin=15 colour=blue").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    let err = Params::parse("max_bin=15 max_bins=16").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationError);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn reference_binning_reuses_bins(values in prop::collection::vec(-10.0f64..10.0, 1..60)) {
        let reference = testing::dense_dataset(&features(), &config(), None).unwrap();
        let rows = Array2::from_shape_fn((values.len(), COLS), |(r, _)| values[r]);
        let valid = testing::dense_dataset(&rows, &config(), Some(&reference)).unwrap();

        prop_assert!(valid.shares_bins_with(&reference));
        for f in 0..COLS {
            let mapper = reference.bin_table().mapper(f);
            for (r, &v) in values.iter().enumerate() {
                let bin = valid.bin(r, f);
                prop_assert_eq!(bin, mapper.value_to_bin(v));
                if v > mapper.max_val() {
                    prop_assert_eq!(bin, mapper.n_bins() - 1);
                }
                if v < mapper.min_val() {
                    prop_assert_eq!(bin, 0);
                }
            }
        }
    }
}
