use crate::{mean, BoostError, FitResult};
use itertools::izip;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clamp for probabilities before taking a log-odds.
const PROBA_EPS: f64 = 1e-15;
/// Below this curvature, a Newton step is not defined and the leaf stays at 0.
const MIN_DENOMINATOR: f64 = 1e-150;

/// Differentiable objective minimized by the boosting.
///
/// Predictions handled by the losses are always raw additive scores: for the classification
/// losses a score is a log-odds, and [`Loss::transform`] maps it to a probability.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// L2 loss, ie the usual loss for a regression.
    #[default]
    #[serde(alias = "ls", alias = "l2")]
    SquaredError,
    /// Binary log loss, for two-class classification with targets in {0, 1}.
    #[serde(alias = "log_loss", alias = "deviance")]
    Logistic,
    /// AdaBoost loss, for two-class classification with targets in {0, 1}.
    Exponential,
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0. {
        1. / (1. + (-x).exp())
    } else {
        let e = x.exp();
        e / (1. + e)
    }
}

/// log(1 + exp(x)) without overflow
fn softplus(x: f64) -> f64 {
    x.max(0.) + (-x.abs()).exp().ln_1p()
}

/// Map a {0, 1} target to {-1, 1}
fn signed(target: f64) -> f64 {
    2. * target - 1.
}

impl Loss {
    pub fn is_classification(&self) -> bool {
        match self {
            Loss::SquaredError => false,
            Loss::Logistic | Loss::Exponential => true,
        }
    }

    /// Pseudo-residuals: the negative gradient of the loss with respect to the predictions.
    ///
    /// # Panics
    /// If `target` and `predictions` have different lengths.
    pub fn negative_gradient(&self, target: &[f64], predictions: &[f64]) -> Vec<f64> {
        assert_eq!(target.len(), predictions.len());
        target
            .iter()
            .zip(predictions)
            .map(|(&y, &f)| self.negative_gradient_one(y, f))
            .collect()
    }

    fn negative_gradient_one(&self, y: f64, f: f64) -> f64 {
        match self {
            Loss::SquaredError => y - f,
            Loss::Logistic => y - sigmoid(f),
            Loss::Exponential => {
                let y = signed(y);
                y * (-y * f).exp()
            }
        }
    }

    /// Optimal constant to add to the predictions of a subset of samples.
    ///
    /// It's the mean of the residuals for the squared error, and a single Newton-Raphson step
    /// for the classification losses. An empty subset gives 0.
    ///
    /// # Panics
    /// If `target` and `predictions` have different lengths.
    pub fn leaf_value(&self, target: &[f64], predictions: &[f64]) -> f64 {
        assert_eq!(target.len(), predictions.len());
        self.leaf_value_pairs(target.iter().copied().zip(predictions.iter().copied()))
    }

    /// Same as [`Loss::leaf_value`], on the rows `indices` of the full vectors.
    pub(crate) fn leaf_value_indices(
        &self,
        target: &[f64],
        predictions: &[f64],
        indices: &[usize],
    ) -> f64 {
        self.leaf_value_pairs(indices.iter().map(|&i| (target[i], predictions[i])))
    }

    fn leaf_value_pairs(&self, pairs: impl Iterator<Item = (f64, f64)>) -> f64 {
        let (mut numerator, mut denominator, mut n) = (0., 0., 0usize);
        for (y, f) in pairs {
            n += 1;
            match self {
                Loss::SquaredError => numerator += y - f,
                Loss::Logistic => {
                    let p = sigmoid(f);
                    numerator += y - p;
                    denominator += p * (1. - p);
                }
                Loss::Exponential => {
                    let y = signed(y);
                    let w = (-y * f).exp();
                    numerator += y * w;
                    denominator += w;
                }
            }
        }
        if n == 0 {
            return 0.;
        }
        match self {
            Loss::SquaredError => numerator / n as f64,
            Loss::Logistic | Loss::Exponential => {
                if denominator.abs() < MIN_DENOMINATOR {
                    0.
                } else {
                    numerator / denominator
                }
            }
        }
    }

    /// Constant prediction of the round 0.
    pub fn initial_value(&self, target: &[f64]) -> f64 {
        if target.is_empty() {
            return 0.;
        }
        match self {
            Loss::SquaredError => mean(target),
            Loss::Logistic => {
                let p = mean(target).max(PROBA_EPS).min(1. - PROBA_EPS);
                (p / (1. - p)).ln()
            }
            Loss::Exponential => {
                let p = mean(target).max(PROBA_EPS).min(1. - PROBA_EPS);
                0.5 * (p / (1. - p)).ln()
            }
        }
    }

    /// Total loss of the predictions. Empty vectors give 0.
    ///
    /// # Panics
    /// If `target` and `predictions` have different lengths.
    pub fn calc_loss(&self, target: &[f64], predictions: &[f64]) -> f64 {
        assert_eq!(target.len(), predictions.len());
        let mut total = 0.;
        for (&y, &f) in izip!(target, predictions) {
            total += match self {
                Loss::SquaredError => (y - f).powi(2),
                // target Y = 0 or 1, proba p = 1 / (1 + exp(-f))
                // -Loss = Y * log(p) + (1-Y) * log(1-p) = Y * f - log(1 + exp(f))
                Loss::Logistic => softplus(f) - y * f,
                Loss::Exponential => (-signed(y) * f).exp(),
            };
        }
        total
    }

    /// Map a raw score to the scale of the target: identity for a regression, the
    /// probability of the class 1 for a classification.
    pub fn transform(&self, raw: f64) -> f64 {
        match self {
            Loss::SquaredError => raw,
            Loss::Logistic => sigmoid(raw),
            Loss::Exponential => sigmoid(2. * raw),
        }
    }

    /// Check that the target is usable with this loss.
    pub(crate) fn check_target(&self, target: &[f64]) -> FitResult<()> {
        if let Some(y) = target.iter().find(|y| !y.is_finite()) {
            return Err(BoostError::InvalidValue(format!(
                "target must be finite, got {}",
                y
            )));
        }
        if self.is_classification() {
            if let Some(y) = target.iter().find(|&&y| y != 0. && y != 1.) {
                return Err(BoostError::InvalidValue(format!(
                    "target of a {} loss must be 0 or 1, got {}",
                    self, y
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Loss::SquaredError => "squared_error",
            Loss::Logistic => "logistic",
            Loss::Exponential => "exponential",
        })
    }
}

impl FromStr for Loss {
    type Err = BoostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "squared_error" | "ls" | "l2" => Ok(Loss::SquaredError),
            "logistic" | "log_loss" | "deviance" => Ok(Loss::Logistic),
            "exponential" => Ok(Loss::Exponential),
            _ => Err(BoostError::InvalidHyperparameter(format!(
                "unknown loss {:?}, expected squared_error, logistic or exponential",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clone the vector and increase a given index
    fn inc_vec(v: &[f64], i: usize, eps: f64) -> Vec<f64> {
        let mut v = v.to_vec();
        v[i] += eps;
        v
    }

    macro_rules! assert_close {
        ($a : expr, $b: expr, $delta: expr) => {{
            let (a, b, delta) = ($a, $b, $delta);
            assert!(
                (a - b).abs() <= delta,
                "Difference = {:.6} > {:.6} too important between {:.6} and {:.6}",
                a - b,
                delta,
                a,
                b
            );
        }};
    }

    /// Compare the negative gradient with a centered finite difference of the loss.
    /// `scale` is the factor between the negative gradient and -dLoss/dprediction.
    fn check_gradient(loss: Loss, target: &[f64], predictions: &[f64], scale: f64) {
        let eps = 1e-5;
        let grad = loss.negative_gradient(target, predictions);
        for i in 0..target.len() {
            // f'(x) = (f(x+eps) - f(x-eps)) / (2*eps)
            let l_plus = loss.calc_loss(target, &inc_vec(predictions, i, eps));
            let l_minus = loss.calc_loss(target, &inc_vec(predictions, i, -eps));
            let grad_emp = -(l_plus - l_minus) / (2. * eps) * scale;
            assert_close!(grad[i], grad_emp, 1e-5);
        }
    }

    #[test]
    fn test_reg_loss() {
        let target = vec![0.1, 0.4, 1.3, 0.2];
        let predictions = vec![0.1, 0.4, 1.0, 0.0];
        let loss = Loss::SquaredError;
        assert_close!(loss.calc_loss(&target, &predictions), 0.13, 1e-12);
        assert_eq!(
            loss.negative_gradient(&target, &predictions),
            vec![0., 0., 1.3 - 1.0, 0.2]
        );
        // The residual is half of the derivative of the squared error
        check_gradient(loss, &target, &predictions, 0.5);
    }

    //noinspection RsApproxConstant
    #[test]
    fn test_binary_loss() {
        let target = vec![1., 1., 0., 1.];
        let predictions = vec![0.1, 0.4, 0.9, 0.3];
        let loss = Loss::Logistic;
        let expected = 2.9529210316741383;
        assert_close!(loss.calc_loss(&target, &predictions), expected, 1e-6);
        check_gradient(loss, &target, &predictions, 1.);
    }

    #[test]
    fn test_exponential_loss() {
        let target = vec![1., 0., 0., 1.];
        let predictions = vec![0.2, -0.4, 0.5, -0.1];
        check_gradient(Loss::Exponential, &target, &predictions, 1.);
    }

    #[test]
    fn test_binary_loss_is_stable() {
        let loss = Loss::Logistic;
        let value = loss.calc_loss(&[0., 1.], &[800., -800.]);
        assert!(value.is_finite());
        assert_close!(value, 1600., 1e-9);
        assert_eq!(loss.transform(-800.), 0.);
        assert_eq!(loss.transform(800.), 1.);
    }

    #[test]
    fn test_initial_value() {
        assert_close!(Loss::SquaredError.initial_value(&[1., 2., 6.]), 3., 1e-12);
        // p = 0.75 => log-odds = ln(3)
        let target = [1., 1., 1., 0.];
        assert_close!(Loss::Logistic.initial_value(&target), 3f64.ln(), 1e-12);
        assert_close!(Loss::Exponential.initial_value(&target), 0.5 * 3f64.ln(), 1e-12);
        // A single class must not give an infinite value
        assert!(Loss::Logistic.initial_value(&[1., 1.]).is_finite());
        assert_eq!(Loss::Logistic.initial_value(&[]), 0.);
    }

    #[test]
    fn test_leaf_value() {
        let target = [1., 2., 3.];
        let predictions = [0., 0., 0.];
        assert_close!(Loss::SquaredError.leaf_value(&target, &predictions), 2., 1e-12);
        assert_eq!(Loss::SquaredError.leaf_value(&[], &[]), 0.);
        assert_eq!(Loss::Logistic.leaf_value(&[], &[]), 0.);

        // At f = 0, p = 0.5: sum(y - p) / sum(p * (1 - p)) = (0.5 + 0.5 - 0.5) / 0.75
        let leaf = Loss::Logistic.leaf_value(&[1., 1., 0.], &[0., 0., 0.]);
        assert_close!(leaf, 0.5 / 0.75, 1e-12);

        // Saturated predictions have no curvature left
        let leaf = Loss::Logistic.leaf_value(&[1.], &[800.]);
        assert_eq!(leaf, 0.);

        let leaf = Loss::Exponential.leaf_value(&[1., 1., 0.], &[0., 0., 0.]);
        assert_close!(leaf, 1. / 3., 1e-12);

        let indices = [0, 2];
        let full = Loss::SquaredError.leaf_value_indices(&target, &predictions, &indices);
        assert_close!(full, 2., 1e-12);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ls".parse::<Loss>(), Ok(Loss::SquaredError));
        assert_eq!("deviance".parse::<Loss>(), Ok(Loss::Logistic));
        assert_eq!("exponential".parse::<Loss>(), Ok(Loss::Exponential));
        assert!("huber".parse::<Loss>().is_err());
        assert_eq!(Loss::Logistic.to_string(), "logistic");
        assert_eq!(Loss::default(), Loss::SquaredError);
    }

    #[test]
    fn test_empty_and_mismatched_lengths() {
        assert_eq!(Loss::Logistic.calc_loss(&[], &[]), 0.);
        assert!(Loss::Exponential.negative_gradient(&[], &[]).is_empty());
        let result = std::panic::catch_unwind(|| Loss::SquaredError.calc_loss(&[1., 2.], &[1.]));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_target() {
        assert!(Loss::SquaredError.check_target(&[0.3, -2.]).is_ok());
        assert!(Loss::Logistic.check_target(&[0., 1., 1.]).is_ok());
        assert!(Loss::Logistic.check_target(&[0., 0.5]).is_err());
        assert!(Loss::SquaredError.check_target(&[f64::NAN]).is_err());
    }
}
