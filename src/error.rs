use thiserror::Error;

/// Error raised while fitting or using a model.
///
/// Validation errors are raised before any training work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoostError {
    #[error("invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),

    #[error("shape mismatch on {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("the model is not fitted yet, call `fit` first")]
    NotFitted,

    #[error("cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl BoostError {
    pub(crate) fn shape(what: &'static str, expected: usize, got: usize) -> Self {
        BoostError::ShapeMismatch {
            what,
            expected,
            got,
        }
    }
}

pub type FitResult<T> = Result<T, BoostError>;
