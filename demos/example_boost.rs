use gboost::datasets::make_regression;
use gboost::{parse_csv, rmse, GBTParams, GradientBoosting};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::Write;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // A tab separated file with the target in the first column, or a synthetic problem
    let dataset = match std::env::args().nth(1) {
        Some(path) => parse_csv(&std::fs::read_to_string(path)?, "\t")?,
        None => make_regression(2_000, 10, 6, 10., 42),
    };
    let mut rng = StdRng::seed_from_u64(42);
    let (train, test) = dataset.train_test_split(0.2, &mut rng)?;

    let params = GBTParams {
        verbose: true,
        ..GBTParams::new()
    };
    println!("Params {:?}", params);

    let mut estimator = GradientBoosting::new(params);
    let train_start_time = Instant::now();
    let gbt = estimator.fit(&train.features, &train.target)?;
    println!(
        "Training of {} trees finished. Elapsed: {:.2} secs",
        gbt.n_trees(),
        train_start_time.elapsed().as_secs_f64()
    );

    let yhat_train = estimator.predict(&train.features)?;
    println!(
        "TRAIN: RMSE {:.8}, R2 {:.8}",
        rmse(&train.target, &yhat_train),
        estimator.score(&train.features, &train.target)?
    );
    let yhat_test = estimator.predict(&test.features)?;
    println!(
        "TEST:  RMSE {:.8}, R2 {:.8}",
        rmse(&test.target, &yhat_test),
        estimator.score(&test.features, &test.target)?
    );

    println!("Serializing model to example_boost.json");
    let serialized: String = serde_json::to_string(&estimator.model())?;
    let mut file = File::create("example_boost.json")?;
    file.write_all(serialized.as_bytes())?;

    println!("Writing predictions to example_boost.csv");
    let file = File::create("example_boost.csv")?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(["dataset", "true_val", "yhat"])?;
    for (true_val, yhat) in train.target.iter().zip(yhat_train.iter()) {
        wtr.write_record(["train", &true_val.to_string(), &yhat.to_string()])?;
    }
    for (true_val, yhat) in test.target.iter().zip(yhat_test.iter()) {
        wtr.write_record(["test", &true_val.to_string(), &yhat.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
