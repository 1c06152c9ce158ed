use crate::{
    BoostError, FitResult, Loss, TreeParams, DEFAULT_LEARNING_RATE, DEFAULT_MAX_DEPTH,
    DEFAULT_MIN_SAMPLES_LEAF, DEFAULT_MIN_SAMPLES_SPLIT, DEFAULT_N_ESTIMATORS,
};
use serde_derive::{Deserialize, Serialize};

/// Hyperparameters of the boosting, as a flat configuration.
///
/// Missing fields take their default value when deserialized:
///
/// ```
/// let params: gboost::GBTParams =
///     serde_json::from_str(r#"{"n_estimators": 50, "loss": "ls"}"#).unwrap();
/// assert_eq!(params.n_estimators, 50);
/// assert_eq!(params.loss, gboost::Loss::SquaredError);
/// assert_eq!(params.max_depth, 3);
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GBTParams {
    /// Number of boosting rounds, ie of trees.
    pub n_estimators: usize,
    /// Shrinkage applied to every tree, in (0, 1].
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub loss: Loss,
    /// Log the training loss of every round at the info level instead of debug.
    pub verbose: bool,
}

impl GBTParams {
    pub fn new() -> Self {
        GBTParams {
            n_estimators: DEFAULT_N_ESTIMATORS,
            learning_rate: DEFAULT_LEARNING_RATE,
            max_depth: DEFAULT_MAX_DEPTH,
            min_samples_split: DEFAULT_MIN_SAMPLES_SPLIT,
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
            loss: Loss::default(),
            verbose: false,
        }
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }

    pub fn validate(&self) -> FitResult<()> {
        if self.n_estimators < 1 {
            return Err(BoostError::InvalidHyperparameter(format!(
                "n_estimators must be >= 1, got {}",
                self.n_estimators
            )));
        }
        // Written so that NAN fails too
        if !(self.learning_rate > 0. && self.learning_rate <= 1.) {
            return Err(BoostError::InvalidHyperparameter(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        self.tree_params().validate()
    }
}

impl Default for GBTParams {
    fn default() -> Self {
        Self::new()
    }
}
