use gboost::datasets::make_regression;
use gboost::{rmse, RegressionTree, TreeParams};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dataset = make_regression(1_000, 5, 5, 10., 3);
    let mut rng = StdRng::seed_from_u64(3);
    let (train, test) = dataset.train_test_split(0.2, &mut rng)?;

    for max_depth in 1..8 {
        let tree_params = TreeParams {
            max_depth,
            ..TreeParams::default()
        };
        println!("\nParams tree{:?}", tree_params);

        let tree = RegressionTree::fit(&train.features, &train.target, &tree_params)?;
        println!("Depth {}, {} leaves", tree.depth(), tree.n_leaves());

        let yhat_train = tree.predict(&train.features)?;
        println!("RMSE train {:.8}", rmse(&train.target, &yhat_train));

        let yhat_test = tree.predict(&test.features)?;
        println!("RMSE Test {:.8}", rmse(&test.target, &yhat_test));
    }
    Ok(())
}
