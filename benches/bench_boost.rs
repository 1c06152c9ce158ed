use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gboost::datasets::{make_classification, make_regression};
use gboost::{GBTParams, Loss, GBT};

fn bench_boost(c: &mut Criterion) {
    let mut group = c.benchmark_group("boost");
    group.sample_size(10);

    let regression = make_regression(2_000, 10, 6, 10., 0);
    let classification = make_classification(2_000, 10, 0);
    for (loss, train) in [
        (Loss::SquaredError, &regression),
        (Loss::Logistic, &classification),
        (Loss::Exponential, &classification),
    ] {
        let params = GBTParams::new().with_n_estimators(50).with_loss(loss);
        group.bench_with_input(BenchmarkId::from_parameter(loss), train, |b, train| {
            b.iter(|| GBT::build(&params, &train.features, &train.target))
        });
    }

    let gbt = GBT::build(&GBTParams::new(), &regression.features, &regression.target)
        .expect("Training failed");
    group.bench_function("predict", |b| b.iter(|| gbt.predict(&regression.features)));
    group.finish();
}

criterion_group!(benches, bench_boost);
criterion_main!(benches);
