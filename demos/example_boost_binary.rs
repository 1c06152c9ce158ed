use gboost::datasets::make_classification;
use gboost::{accuracy, log_loss, GBTParams, Loss, GBT};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dataset = make_classification(2_000, 8, 7);
    let mut rng = StdRng::seed_from_u64(7);
    let (train, test) = dataset.train_test_split(0.25, &mut rng)?;

    for loss in [Loss::Logistic, Loss::Exponential] {
        let params = GBTParams::new().with_n_estimators(200).with_loss(loss);
        println!("\nParams {:?}", params);

        let train_start_time = Instant::now();
        let gbt = GBT::build(&params, &train.features, &train.target)?;
        println!(
            "Training of {} trees finished. Elapsed: {:.2} secs",
            gbt.n_trees(),
            train_start_time.elapsed().as_secs_f64()
        );

        let proba_train = gbt.predict_proba(&train.features)?;
        let labels_train = gbt.predict_labels(&train.features)?;
        println!(
            "TRAIN: log loss {:.8}, accuracy {:.8}",
            log_loss(&train.target, &proba_train),
            accuracy(&train.target, &labels_train),
        );

        let proba_test = gbt.predict_proba(&test.features)?;
        let labels_test = gbt.predict_labels(&test.features)?;
        println!(
            "TEST:  log loss {:.8}, accuracy {:.8}",
            log_loss(&test.target, &proba_test),
            accuracy(&test.target, &labels_test),
        );
    }
    Ok(())
}
