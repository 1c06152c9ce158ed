pub fn sum(v: &[f64]) -> f64 {
    let mut o = 0.;
    for e in v.iter() {
        o += *e;
    }
    o
}

/// The mean of an empty slice is NaN.
pub fn mean(v: &[f64]) -> f64 {
    sum(v) / (v.len() as f64)
}

/// Mean squared error. Empty slices give NaN.
///
/// # Panics
/// If the slices have different lengths.
pub fn mse(target: &[f64], yhat: &[f64]) -> f64 {
    assert_eq!(target.len(), yhat.len());
    let errors: f64 = yhat
        .iter()
        .zip(target.iter())
        .map(|(&a, &b)| (a - b).powi(2))
        .sum();
    errors / target.len() as f64
}

pub fn rmse(target: &[f64], yhat: &[f64]) -> f64 {
    mse(target, yhat).sqrt()
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: the score is then 1 for a perfect fit and
/// 0 otherwise. An empty target is constant, so it scores 1.
///
/// # Panics
/// If the slices have different lengths.
pub fn r2_score(target: &[f64], yhat: &[f64]) -> f64 {
    assert_eq!(target.len(), yhat.len());
    let target_mean = mean(target);
    let (mut ss_res, mut ss_tot) = (0., 0.);
    for (&y, &pred) in target.iter().zip(yhat) {
        ss_res += (y - pred).powi(2);
        ss_tot += (y - target_mean).powi(2);
    }
    if ss_tot == 0. {
        return if ss_res == 0. { 1. } else { 0. };
    }
    1. - ss_res / ss_tot
}

/// Fraction of the labels predicted exactly. Empty slices give NaN.
///
/// # Panics
/// If the slices have different lengths.
pub fn accuracy(target: &[f64], labels: &[f64]) -> f64 {
    assert_eq!(target.len(), labels.len());
    let n_ok = target
        .iter()
        .zip(labels)
        .filter(|(&y, &label)| y == label)
        .count();
    n_ok as f64 / target.len() as f64
}

/// Mean binary cross-entropy of probabilities of the class 1. Empty slices give NaN.
///
/// # Panics
/// If the slices have different lengths.
pub fn log_loss(target: &[f64], probas: &[f64]) -> f64 {
    assert_eq!(target.len(), probas.len());
    let eps = 1e-15;
    let total: f64 = target
        .iter()
        .zip(probas)
        .map(|(&y, &p)| {
            let p = p.max(eps).min(1. - eps);
            -(y * p.ln() + (1. - y) * (1. - p).ln())
        })
        .sum();
    total / target.len() as f64
}

pub(crate) fn sum_indices(v: &[f64], indices: &[usize]) -> f64 {
    let mut o = 0.;
    for &i in indices {
        o += v[i];
    }
    o
}
