//! Gradient boosting of shallow regression trees.
//!
//! An additive ensemble is trained by functional gradient descent: every round fits a
//! [`RegressionTree`] to the pseudo-residuals of the current staged prediction, and adds it
//! to the model damped by the learning rate. See [`GBT`] for the fitted model and
//! [`GradientBoosting`] for the estimator interface.

mod data;
pub mod datasets;
mod error;
mod gbt;
mod losses;
mod math;
mod matrix;
mod params;
mod tree;

pub use crate::data::*;
pub use crate::error::*;
pub use crate::gbt::*;
pub use crate::losses::*;
pub use crate::math::*;
pub use crate::matrix::*;
pub use crate::params::*;
pub use crate::tree::*;

pub(crate) static DEFAULT_N_ESTIMATORS: usize = 100;
pub(crate) static DEFAULT_LEARNING_RATE: f64 = 0.1;
pub(crate) static DEFAULT_MAX_DEPTH: usize = 3;
pub(crate) static DEFAULT_MIN_SAMPLES_SPLIT: usize = 2;
pub(crate) static DEFAULT_MIN_SAMPLES_LEAF: usize = 1;
