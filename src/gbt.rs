use crate::{
    accuracy, r2_score, BoostError, ColumnMajorMatrix, FitResult, GBTParams, Loss,
    RegressionTree, StridedVecView,
};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use std::time::Instant;

/// Fitted gradient boosting model.
///
/// The prediction of a row is `initial_prediction + learning_rate * sum(tree(row))`, the trees
/// being added in the order of the boosting rounds. A `GBT` only exists fully fitted and is
/// read-only: it can be shared between threads to predict concurrently.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GBT {
    models: Vec<RegressionTree>,
    params: GBTParams,
    initial_prediction: f64,
    n_features: usize,
    train_loss: Vec<f64>,
}

fn check_features(features: &ColumnMajorMatrix<f64>) -> FitResult<()> {
    match features.flat().iter().find(|x| !x.is_finite()) {
        Some(x) => Err(BoostError::InvalidValue(format!(
            "features must be finite, got {}",
            x
        ))),
        None => Ok(()),
    }
}

impl GBT {
    /// Train a model with `params.n_estimators` rounds of boosting.
    ///
    /// Every input is validated before the training starts.
    pub fn build(
        params: &GBTParams,
        features: &ColumnMajorMatrix<f64>,
        target: &[f64],
    ) -> FitResult<GBT> {
        params.validate()?;
        if features.n_rows() == 0 {
            return Err(BoostError::EmptyDataset);
        }
        if target.len() != features.n_rows() {
            return Err(BoostError::shape(
                "target length",
                features.n_rows(),
                target.len(),
            ));
        }
        check_features(features)?;
        let loss = params.loss;
        loss.check_target(target)?;

        let n_rows = features.n_rows();
        let tree_params = params.tree_params();
        let train_start_time = Instant::now();
        tracing::info!(
            n_rows,
            n_features = features.n_cols(),
            loss = %loss,
            n_estimators = params.n_estimators,
            "Training gradient boosting"
        );

        let initial_prediction = loss.initial_value(target);
        // Staged predictions on the train set. They are only exposed through the final model.
        let mut train_scores = vec![initial_prediction; n_rows];
        // Predictions per tree. We create it before so we don't have to allocate a new vector at
        // each iteration
        let mut tree_predictions = vec![0.; n_rows];
        let mut models = Vec::with_capacity(params.n_estimators);
        let mut train_loss = Vec::with_capacity(params.n_estimators);

        for iter_cnt in 0..params.n_estimators {
            let residuals = loss.negative_gradient(target, &train_scores);
            let scores = &train_scores;
            let tree = RegressionTree::build(
                features,
                &residuals,
                &tree_params,
                |indices| loss.leaf_value_indices(target, scores, indices),
                &mut tree_predictions,
            );

            for (score, &val) in train_scores.iter_mut().zip(&tree_predictions) {
                *score += params.learning_rate * val;
            }
            let round_loss = loss.calc_loss(target, &train_scores) / n_rows as f64;
            if params.verbose {
                tracing::info!(round = iter_cnt + 1, train_loss = round_loss, "Boosting round");
            } else {
                tracing::debug!(round = iter_cnt + 1, train_loss = round_loss, "Boosting round");
            }
            train_loss.push(round_loss);
            models.push(tree);
        }

        tracing::info!(
            n_trees = models.len(),
            elapsed_secs = train_start_time.elapsed().as_secs_f64(),
            "Training finished"
        );
        Ok(GBT {
            models,
            params: params.clone(),
            initial_prediction,
            n_features: features.n_cols(),
            train_loss,
        })
    }

    fn check_n_cols(&self, n_cols: usize) -> FitResult<()> {
        if n_cols != self.n_features {
            return Err(BoostError::shape("number of features", self.n_features, n_cols));
        }
        Ok(())
    }

    /// Raw score of one row.
    ///
    /// # Panics
    /// If the row has fewer features than the train set.
    pub fn predict_row(&self, features: &StridedVecView<f64>) -> f64 {
        let mut o = self.initial_prediction;
        for model in &self.models {
            o += self.params.learning_rate * model.predict_row(features);
        }
        o
    }

    /// Raw score of one row given as a slice.
    pub fn predict_one(&self, row: &[f64]) -> FitResult<f64> {
        self.check_n_cols(row.len())?;
        Ok(self.predict_row(&StridedVecView::from_slice(row)))
    }

    /// Raw scores: the target for a regression, the log-odds for a classification.
    pub fn predict(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<f64>> {
        self.check_n_cols(features.n_cols())?;
        Ok((0..features.n_rows())
            .into_par_iter()
            .map(|i| self.predict_row(&features.row(i)))
            .collect())
    }

    /// Raw scores after every boosting round: the item `k` uses the first `k + 1` trees.
    pub fn staged_predict(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<Vec<f64>>> {
        self.check_n_cols(features.n_cols())?;
        let mut scores = vec![self.initial_prediction; features.n_rows()];
        let mut stages = Vec::with_capacity(self.models.len());
        for model in &self.models {
            for (score, val) in scores.iter_mut().zip(model.predict(features)?) {
                *score += self.params.learning_rate * val;
            }
            stages.push(scores.clone());
        }
        Ok(stages)
    }

    fn check_classification(&self) -> FitResult<()> {
        if !self.loss().is_classification() {
            return Err(BoostError::InvalidValue(format!(
                "probabilities and labels need a classification loss, the model uses {}",
                self.loss()
            )));
        }
        Ok(())
    }

    /// Probability of the class 1, for a classification loss.
    pub fn predict_proba(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<f64>> {
        self.check_classification()?;
        let loss = self.loss();
        Ok(self
            .predict(features)?
            .into_iter()
            .map(|raw| loss.transform(raw))
            .collect())
    }

    /// Labels in {0, 1}, for a classification loss. A row is of class 1 when its probability
    /// is above 0.5, ie when its raw score is positive.
    pub fn predict_labels(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<f64>> {
        self.check_classification()?;
        Ok(self
            .predict(features)?
            .into_iter()
            .map(|raw| if raw > 0. { 1. } else { 0. })
            .collect())
    }

    /// R² for a regression, accuracy for a classification.
    pub fn score(&self, features: &ColumnMajorMatrix<f64>, target: &[f64]) -> FitResult<f64> {
        self.check_n_cols(features.n_cols())?;
        if features.n_rows() == 0 {
            return Err(BoostError::EmptyDataset);
        }
        if target.len() != features.n_rows() {
            return Err(BoostError::shape(
                "target length",
                features.n_rows(),
                target.len(),
            ));
        }
        if self.loss().is_classification() {
            Ok(accuracy(target, &self.predict_labels(features)?))
        } else {
            Ok(r2_score(target, &self.predict(features)?))
        }
    }

    pub fn n_trees(&self) -> usize {
        self.models.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.models
    }

    pub fn initial_prediction(&self) -> f64 {
        self.initial_prediction
    }

    pub fn learning_rate(&self) -> f64 {
        self.params.learning_rate
    }

    pub fn loss(&self) -> Loss {
        self.params.loss
    }

    pub fn params(&self) -> &GBTParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean loss on the train set after every round.
    pub fn train_loss(&self) -> &[f64] {
        &self.train_loss
    }
}

/// Estimator wrapping the hyperparameters and, once fitted, a [`GBT`].
///
/// A new fit replaces the model only when it succeeds.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientBoosting {
    params: GBTParams,
    model: Option<GBT>,
}

impl GradientBoosting {
    pub fn new(params: GBTParams) -> Self {
        GradientBoosting {
            params,
            model: None,
        }
    }

    pub fn fit(&mut self, features: &ColumnMajorMatrix<f64>, target: &[f64]) -> FitResult<&GBT> {
        let model = GBT::build(&self.params, features, target)?;
        Ok(&*self.model.insert(model))
    }

    fn fitted(&self) -> FitResult<&GBT> {
        self.model.as_ref().ok_or(BoostError::NotFitted)
    }

    pub fn predict(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<f64>> {
        self.fitted()?.predict(features)
    }

    pub fn staged_predict(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<Vec<f64>>> {
        self.fitted()?.staged_predict(features)
    }

    pub fn predict_proba(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<f64>> {
        self.fitted()?.predict_proba(features)
    }

    pub fn predict_labels(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<f64>> {
        self.fitted()?.predict_labels(features)
    }

    pub fn score(&self, features: &ColumnMajorMatrix<f64>, target: &[f64]) -> FitResult<f64> {
        self.fitted()?.score(features, target)
    }

    pub fn params(&self) -> &GBTParams {
        &self.params
    }

    pub fn model(&self) -> Option<&GBT> {
        self.model.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn into_model(self) -> Option<GBT> {
        self.model
    }
}
