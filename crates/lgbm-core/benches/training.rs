//! Training and prediction throughput on synthetic binary data.

use std::sync::Arc;

use lgbm_core::data::NumericSlice;
use lgbm_core::{Booster, BoosterConfig, Dataset, DatasetConfig, Params, PredictKind, testing};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn train_set(rows: usize, cols: usize) -> (Arc<Dataset>, ndarray::Array2<f64>) {
    let (features, labels) = testing::binary_classification(rows, cols, 42);
    let mut dataset = testing::dense_dataset(&features, &DatasetConfig::default(), None).unwrap();
    dataset.set_field("label", NumericSlice::F32(&labels)).unwrap();
    (Arc::new(dataset), features)
}

fn config(params: &str) -> BoosterConfig {
    BoosterConfig::from_params(&Params::parse(params).unwrap()).unwrap()
}

fn bench_binning(c: &mut Criterion) {
    let mut group = c.benchmark_group("binning");
    for rows in [1_000usize, 10_000, 50_000] {
        let features = testing::random_features(rows, 20, 7, -5.0, 5.0);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("dense_20", rows), &features, |b, features| {
            b.iter(|| testing::dense_dataset(black_box(features), &DatasetConfig::default(), None).unwrap())
        });
    }
    group.finish();
}

fn bench_rounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("train/10_rounds");
    group.sample_size(10);
    for threads in [1usize, 0] {
        let (train, _) = train_set(20_000, 20);
        let params = format!("objective=binary num_iterations=10 num_leaves=31 num_threads={threads} verbose=-1");
        group.bench_function(BenchmarkId::new("threads", threads), |b| {
            b.iter(|| {
                let mut booster = Booster::new(Arc::clone(&train), vec![], config(&params)).unwrap();
                while !booster.update_one_iter().unwrap() {}
                black_box(booster.num_trees())
            })
        });
    }
    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let (train, features) = train_set(10_000, 20);
    let mut booster = Booster::new(train, vec![], config("objective=binary num_iterations=50 verbose=-1")).unwrap();
    while !booster.update_one_iter().unwrap() {}

    let mut group = c.benchmark_group("predict/matrix");
    group.throughput(Throughput::Elements(features.nrows() as u64));
    for kind in [PredictKind::RawScore, PredictKind::LeafIndex] {
        group.bench_function(format!("{kind:?}"), |b| {
            b.iter(|| black_box(booster.predict_matrix(features.view(), kind, None)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_binning, bench_rounds, bench_predict);
criterion_main!(benches);
