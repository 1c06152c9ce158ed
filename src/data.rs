use crate::{BoostError, ColumnMajorMatrix, FitResult};
use rand::seq::SliceRandom;
use rand::Rng;

/// Util for parsing a CSV without headers into a dataset.
///
/// The first column of the CSV must be the target.
pub fn parse_csv(data: &str, sep: &str) -> FitResult<Dataset> {
    let mut target: Vec<f64> = Vec::new();
    let mut features: Vec<Vec<f64>> = Vec::new();
    let parse = |n_line: usize, item: &str| {
        item.trim().parse::<f64>().map_err(|_| {
            BoostError::InvalidValue(format!("line {}: {:?} is not a number", n_line + 1, item))
        })
    };
    for (n_line, l) in data.lines().enumerate() {
        if l.trim().is_empty() {
            continue;
        }
        let mut items = l.split(sep);
        // split always gives at least one item
        if let Some(first) = items.next() {
            target.push(parse(n_line, first)?);
        }
        features.push(items.map(|e| parse(n_line, e)).collect::<FitResult<_>>()?);
    }
    let features = ColumnMajorMatrix::try_from_rows(features)?;
    Dataset::new(features, target)
}

/// Store the raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Predictor for the learning
    pub features: ColumnMajorMatrix<f64>,
    /// Target, used for the learning
    pub target: Vec<f64>,
}

impl Dataset {
    pub fn new(features: ColumnMajorMatrix<f64>, target: Vec<f64>) -> FitResult<Self> {
        if features.n_rows() != target.len() {
            return Err(BoostError::shape(
                "target length",
                features.n_rows(),
                target.len(),
            ));
        }
        Ok(Dataset { features, target })
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn n_cols(&self) -> usize {
        self.features.n_cols()
    }

    /// Copy a subset of the rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select_rows(rows),
            target: rows.iter().map(|&i| self.target[i]).collect(),
        }
    }

    /// Shuffle the rows, and split them into a train and a test set.
    ///
    /// The test set has `ceil(n_rows * test_ratio)` rows. Both sets must be non-empty.
    pub fn train_test_split(
        &self,
        test_ratio: f64,
        rng: &mut impl Rng,
    ) -> FitResult<(Dataset, Dataset)> {
        if !(test_ratio > 0. && test_ratio < 1.) {
            return Err(BoostError::InvalidHyperparameter(format!(
                "test_ratio must be in (0, 1), got {}",
                test_ratio
            )));
        }
        let n_test = (self.n_rows() as f64 * test_ratio).ceil() as usize;
        if n_test == 0 || n_test >= self.n_rows() {
            return Err(BoostError::InvalidValue(format!(
                "cannot split {} rows with a test ratio of {}",
                self.n_rows(),
                test_ratio
            )));
        }
        let mut indices: Vec<usize> = (0..self.n_rows()).collect();
        indices.shuffle(rng);
        let (test, train) = indices.split_at(n_test);
        Ok((self.select_rows(train), self.select_rows(test)))
    }
}
