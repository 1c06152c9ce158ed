use crate::{
    sum_indices, BoostError, ColumnMajorMatrix, FitResult, StridedVecView, DEFAULT_MAX_DEPTH,
    DEFAULT_MIN_SAMPLES_LEAF, DEFAULT_MIN_SAMPLES_SPLIT,
};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};

/// Below this number of (rows x features), the features of a node are scanned sequentially.
const PARALLEL_MIN_WORK: usize = 4096;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    /// A node with fewer rows is a leaf.
    pub min_samples_split: usize,
    /// Minimum number of rows on each side of a split.
    pub min_samples_leaf: usize,
}

impl TreeParams {
    pub fn new() -> Self {
        TreeParams {
            max_depth: DEFAULT_MAX_DEPTH,
            min_samples_split: DEFAULT_MIN_SAMPLES_SPLIT,
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
        }
    }

    pub fn validate(&self) -> FitResult<()> {
        if self.max_depth < 1 {
            return Err(BoostError::InvalidHyperparameter(format!(
                "max_depth must be >= 1, got {}",
                self.max_depth
            )));
        }
        if self.min_samples_split < 2 {
            return Err(BoostError::InvalidHyperparameter(format!(
                "min_samples_split must be >= 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(BoostError::InvalidHyperparameter(format!(
                "min_samples_leaf must be >= 1, got {}",
                self.min_samples_leaf
            )));
        }
        Ok(())
    }
}

impl Default for TreeParams {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SplitNode {
    left_child: Box<Node>,
    right_child: Box<Node>,
    split_feature_id: usize,
    split_val: f64,
}

impl SplitNode {
    pub fn feature_id(&self) -> usize {
        self.split_feature_id
    }

    /// Rows with `value < threshold` go left, the others right.
    pub fn threshold(&self) -> f64 {
        self.split_val
    }

    pub fn left(&self) -> &Node {
        &self.left_child
    }

    pub fn right(&self) -> &Node {
        &self.right_child
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeafNode {
    val: f64,
}

impl LeafNode {
    pub fn value(&self) -> f64 {
        self.val
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Node {
    Split(SplitNode),
    Leaf(LeafNode),
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Node::Split(split) => 1 + split.left_child.depth().max(split.right_child.depth()),
            Node::Leaf(_) => 0,
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            Node::Split(split) => split.left_child.n_leaves() + split.right_child.n_leaves(),
            Node::Leaf(_) => 1,
        }
    }
}

/// Store the result of a successful split on a node
#[derive(Debug)]
struct SplitResult {
    feature_id: usize,
    best_val: f64,
    best_gain: f64,
}

/// Best split of the rows `indices` on one feature, by reduction of the sum of squared
/// residuals. Thresholds are the midpoints between consecutive distinct values, visited in
/// increasing order; only a strictly better gain replaces the current best, and the gain must
/// exceed `min_gain`.
fn calc_gain_direct(
    column: &[f64],
    residuals: &[f64],
    indices: &[usize],
    sum_residuals: f64,
    min_gain: f64,
    params: &TreeParams,
    feature_id: usize,
) -> Option<SplitResult> {
    // Stable sort, so the rows with equal values keep their order
    let mut sorted_instance_ids = indices.to_vec();
    sorted_instance_ids.sort_by_key(|&row_id| OrderedFloat(column[row_id]));

    let n = sorted_instance_ids.len();
    let first_val = column[sorted_instance_ids[0]];
    if first_val == column[sorted_instance_ids[n - 1]] {
        return None;
    }

    // Not splitting is the reference: a split must strictly improve on it
    let base = sum_residuals.powi(2) / n as f64;
    let mut best: Option<SplitResult> = None;
    let mut best_gain = min_gain;
    let mut sum_left = 0.;
    let mut last_val = first_val;

    // The potential split is before the current value, so we have to skip the first
    for (n_left, &nrow) in sorted_instance_ids.iter().enumerate().skip(1) {
        sum_left += residuals[sorted_instance_ids[n_left - 1]];
        let val = column[nrow];
        let n_right = n - n_left;

        // We can only split when the value change
        if val != last_val && n_left >= params.min_samples_leaf && n_right >= params.min_samples_leaf
        {
            let sum_right = sum_residuals - sum_left;
            let gain = sum_left.powi(2) / n_left as f64 + sum_right.powi(2) / n_right as f64 - base;
            if gain > best_gain {
                best_gain = gain;
                // Two adjacent floats can have a midpoint rounded down to the lower one
                let mut threshold = last_val / 2. + val / 2.;
                if threshold <= last_val {
                    threshold = val;
                }
                best = Some(SplitResult {
                    feature_id,
                    best_val: threshold,
                    best_gain: gain,
                });
            }
        }
        last_val = val;
    }
    best
}

/// Best split over all the features. Ties go to the lowest feature index.
fn get_best_split_direct(
    features: &ColumnMajorMatrix<f64>,
    residuals: &[f64],
    indices: &[usize],
    sum_residuals: f64,
    min_gain: f64,
    params: &TreeParams,
) -> Option<SplitResult> {
    let calc = |feature_id: usize| {
        calc_gain_direct(
            features.column(feature_id),
            residuals,
            indices,
            sum_residuals,
            min_gain,
            params,
            feature_id,
        )
    };
    // The results are collected in the order of the features whatever the scheduling
    let results: Vec<Option<SplitResult>> = if indices.len() * features.n_cols() < PARALLEL_MIN_WORK
    {
        (0..features.n_cols()).map(calc).collect()
    } else {
        (0..features.n_cols()).into_par_iter().map(calc).collect()
    };
    results.into_iter().flatten().fold(None, |best, result| match best {
        Some(best) if best.best_gain >= result.best_gain => Some(best),
        _ => Some(result),
    })
}

struct TreeBuilder<'a, F: Fn(&[usize]) -> f64> {
    features: &'a ColumnMajorMatrix<f64>,
    residuals: &'a [f64],
    params: &'a TreeParams,
    leaf_value: F,
}

impl<'a, F: Fn(&[usize]) -> f64> TreeBuilder<'a, F> {
    /// Exact greedy algorithm for split finding. The value of every leaf is written in
    /// `predictions` for the rows that fall in it.
    fn build(&self, indices: &[usize], predictions: &mut [f64], depth: usize) -> Node {
        macro_rules! return_leaf {
            () => {{
                let val = (self.leaf_value)(indices);
                for &i in indices {
                    predictions[i] = val;
                }
                return Node::Leaf(LeafNode { val });
            }};
        }

        if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return_leaf!();
        }

        let first_residual = self.residuals[indices[0]];
        if indices.iter().all(|&i| self.residuals[i] == first_residual) {
            return_leaf!();
        }

        let sum_residuals = sum_indices(self.residuals, indices);
        // Gains below the rounding error of the node are noise
        let sum_squares: f64 = indices.iter().map(|&i| self.residuals[i].powi(2)).sum();
        let min_gain = 4. * f64::EPSILON * indices.len() as f64 * sum_squares;
        let best_result = get_best_split_direct(
            self.features,
            self.residuals,
            indices,
            sum_residuals,
            min_gain,
            self.params,
        );
        let best_result = match best_result {
            Some(e) => e,
            None => return_leaf!(),
        };

        let column = self.features.column(best_result.feature_id);
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&row| column[row] < best_result.best_val);

        let left_child = Box::new(self.build(&left_indices, predictions, depth + 1));
        let right_child = Box::new(self.build(&right_indices, predictions, depth + 1));

        Node::Split(SplitNode {
            left_child,
            right_child,
            split_feature_id: best_result.feature_id,
            split_val: best_result.best_val,
        })
    }
}

/// A fitted regression tree.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RegressionTree {
    root: Node,
    max_depth: usize,
    n_features: usize,
}

impl RegressionTree {
    /// Fit a tree on the residuals. The value of a leaf is the mean of its residuals.
    pub fn fit(
        features: &ColumnMajorMatrix<f64>,
        residuals: &[f64],
        params: &TreeParams,
    ) -> FitResult<RegressionTree> {
        Self::fit_with_leaves(features, residuals, params, |indices| {
            if indices.is_empty() {
                0.
            } else {
                sum_indices(residuals, indices) / indices.len() as f64
            }
        })
    }

    /// Fit a tree whose splits are chosen on the residuals, and whose leaf values are given by
    /// `leaf_value` on the rows of each leaf.
    pub fn fit_with_leaves(
        features: &ColumnMajorMatrix<f64>,
        residuals: &[f64],
        params: &TreeParams,
        leaf_value: impl Fn(&[usize]) -> f64,
    ) -> FitResult<RegressionTree> {
        params.validate()?;
        if features.n_rows() == 0 {
            return Err(BoostError::EmptyDataset);
        }
        if residuals.len() != features.n_rows() {
            return Err(BoostError::shape(
                "residuals length",
                features.n_rows(),
                residuals.len(),
            ));
        }
        let mut predictions = vec![0.; residuals.len()];
        Ok(Self::build(
            features,
            residuals,
            params,
            leaf_value,
            &mut predictions,
        ))
    }

    /// Build without validation, writing the training predictions of the tree.
    pub(crate) fn build(
        features: &ColumnMajorMatrix<f64>,
        residuals: &[f64],
        params: &TreeParams,
        leaf_value: impl Fn(&[usize]) -> f64,
        predictions: &mut [f64],
    ) -> RegressionTree {
        let builder = TreeBuilder {
            features,
            residuals,
            params,
            leaf_value,
        };
        let indices: Vec<usize> = (0..features.n_rows()).collect();
        let root = builder.build(&indices, predictions, 0);
        RegressionTree {
            root,
            max_depth: params.max_depth,
            n_features: features.n_cols(),
        }
    }

    fn descend(&self, value: impl Fn(usize) -> f64) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Split(split) => {
                    node = if value(split.split_feature_id) < split.split_val {
                        &split.left_child
                    } else {
                        &split.right_child
                    }
                }
                Node::Leaf(leaf) => return leaf.val,
            }
        }
    }

    /// # Panics
    /// If the row is shorter than the number of features seen during the fit.
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.descend(|feature_id| row[feature_id])
    }

    /// # Panics
    /// If the row is shorter than the number of features seen during the fit.
    pub fn predict_row(&self, row: &StridedVecView<f64>) -> f64 {
        self.descend(|feature_id| row[feature_id])
    }

    /// Predict every row, in order.
    pub fn predict(&self, features: &ColumnMajorMatrix<f64>) -> FitResult<Vec<f64>> {
        if features.n_cols() != self.n_features {
            return Err(BoostError::shape(
                "number of features",
                self.n_features,
                features.n_cols(),
            ));
        }
        Ok((0..features.n_rows())
            .into_par_iter()
            .map(|i| self.predict_row(&features.row(i)))
            .collect())
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Maximum depth allowed during the fit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Effective depth of the tree.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn column(values: &[f64]) -> ColumnMajorMatrix<f64> {
        ColumnMajorMatrix::from_columns(vec![values.to_vec()])
    }

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            ..TreeParams::default()
        }
    }

    #[test]
    fn test_depth_one() {
        let features = column(&[1., 2., 8., 9.]);
        let tree = RegressionTree::fit(&features, &[1., 1., 10., 10.], &params(1)).unwrap();
        let split = match tree.root() {
            Node::Split(split) => split,
            Node::Leaf(_) => panic!("expected a split"),
        };
        assert_eq!(split.feature_id(), 0);
        assert!(split.threshold() > 2. && split.threshold() <= 8.);
        assert_eq!(split.threshold(), 5.);
        match (split.left(), split.right()) {
            (Node::Leaf(left), Node::Leaf(right)) => {
                assert_eq!(left.value(), 1.);
                assert_eq!(right.value(), 10.);
            }
            _ => panic!("expected two leaves"),
        }
        assert_eq!(tree.predict(&features).unwrap(), vec![1., 1., 10., 10.]);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_constant_feature_is_a_leaf() {
        let features = column(&[3., 3., 3., 3.]);
        let tree = RegressionTree::fit(&features, &[1., 2., 3., 6.], &params(3)).unwrap();
        assert_eq!(tree.root(), &Node::Leaf(LeafNode { val: 3. }));
    }

    #[test]
    fn test_constant_residuals_is_a_leaf() {
        let x: Vec<f64> = (0..37).map(|i| i as f64).collect();
        let features = column(&x);
        for &c in &[0.1, 0.3, 0.001, 1. / 3., 7.7] {
            let tree = RegressionTree::fit(&features, &[c; 37], &params(5)).unwrap();
            assert_eq!(tree.n_leaves(), 1, "residuals {}", c);
            assert_eq!(tree.depth(), 0);
        }

        // Almost constant residuals: the gains are below the rounding error
        let residuals: Vec<f64> = (0..37)
            .map(|i| if i % 2 == 0 { 0.1 } else { 0.1 + f64::EPSILON * 0.1 })
            .collect();
        let tree = RegressionTree::fit(&features, &residuals, &params(5)).unwrap();
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_single_row_is_a_leaf() {
        let features = column(&[3.]);
        let tree = RegressionTree::fit(&features, &[7.], &params(3)).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_one(&[100.]), 7.);
    }

    #[test]
    fn test_min_samples_split() {
        let features = column(&[1., 2., 8., 9.]);
        let params = TreeParams {
            max_depth: 3,
            min_samples_split: 5,
            min_samples_leaf: 1,
        };
        let tree = RegressionTree::fit(&features, &[1., 1., 10., 10.], &params).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_one(&[1.]), 5.5);
    }

    #[test]
    fn test_min_samples_leaf() {
        // The best split alone would isolate the last row
        let features = column(&[1., 2., 3., 4.]);
        let residuals = [0., 0., 0., 12.];
        let tree = RegressionTree::fit(&features, &residuals, &params(1)).unwrap();
        assert_eq!(tree.predict_one(&[3.]), 0.);
        let params = TreeParams {
            max_depth: 1,
            min_samples_split: 2,
            min_samples_leaf: 2,
        };
        let tree = RegressionTree::fit(&features, &residuals, &params).unwrap();
        assert_eq!(tree.predict_one(&[1.]), 0.);
        assert_eq!(tree.predict_one(&[3.]), 6.);
    }

    #[test]
    fn test_ties_take_the_first_threshold() {
        // Splitting after the first or before the last row gives the same gain
        let features = column(&[1., 2., 3., 4.]);
        let tree = RegressionTree::fit(&features, &[1., 0., 0., 1.], &params(1)).unwrap();
        match tree.root() {
            Node::Split(split) => assert_eq!(split.threshold(), 1.5),
            Node::Leaf(_) => panic!("expected a split"),
        }
    }

    #[test]
    fn test_ties_take_the_first_feature() {
        let features = ColumnMajorMatrix::from_columns(vec![
            vec![0., 0., 1., 1.],
            vec![1., 2., 8., 9.],
            vec![1., 2., 8., 9.],
        ]);
        let tree = RegressionTree::fit(&features, &[1., 1., 10., 10.], &params(1)).unwrap();
        match tree.root() {
            Node::Split(split) => {
                assert_eq!(split.feature_id(), 0);
                assert_eq!(split.threshold(), 0.5);
            }
            Node::Leaf(_) => panic!("expected a split"),
        }
    }

    #[test]
    fn test_ties_take_the_first_feature_in_parallel() {
        // Large enough for the features to be scanned on the thread pool
        let n_rows = 5000;
        let values: Vec<f64> = (0..n_rows).map(|i| i as f64).collect();
        let features =
            ColumnMajorMatrix::from_columns(vec![vec![0.; n_rows], values.clone(), values]);
        let residuals: Vec<f64> = (0..n_rows).map(|i| if i < 40 { 0. } else { 1. }).collect();
        for _ in 0..10 {
            let tree = RegressionTree::fit(&features, &residuals, &params(1)).unwrap();
            match tree.root() {
                Node::Split(split) => {
                    assert_eq!(split.feature_id(), 1);
                    assert_eq!(split.threshold(), 39.5);
                }
                Node::Leaf(_) => panic!("expected a split"),
            }
            assert_eq!(tree.predict(&features).unwrap(), residuals);
        }
    }

    #[test]
    fn test_predict_shape() {
        let features = ColumnMajorMatrix::from_columns(vec![vec![1., 2., 8., 9.]; 2]);
        let tree = RegressionTree::fit(&features, &[1., 1., 10., 10.], &params(1)).unwrap();
        assert_eq!(
            tree.predict(&column(&[1., 2.])),
            Err(BoostError::shape("number of features", 2, 1))
        );
    }

    #[test]
    fn test_adjacent_floats() {
        let a: f64 = 1.;
        let b = f64::from_bits(a.to_bits() + 1);
        let features = column(&[a, b]);
        let tree = RegressionTree::fit(&features, &[-1., 1.], &params(1)).unwrap();
        assert_eq!(tree.predict_one(&[a]), -1.);
        assert_eq!(tree.predict_one(&[b]), 1.);
    }

    #[test]
    fn test_errors() {
        let features = column(&[1., 2.]);
        assert_eq!(
            RegressionTree::fit(&features, &[1.], &params(1)),
            Err(BoostError::shape("residuals length", 2, 1))
        );
        assert!(matches!(
            RegressionTree::fit(&features, &[1., 2.], &params(0)),
            Err(BoostError::InvalidHyperparameter(_))
        ));
        let empty = ColumnMajorMatrix::<f64>::from_function(0, 1, |_, _| 0.);
        assert_eq!(
            RegressionTree::fit(&empty, &[], &params(1)),
            Err(BoostError::EmptyDataset)
        );
    }

    #[test]
    fn test_regression() {
        let train = datasets::make_regression(400, 5, 3, 1., 42);
        let params = params(6);

        let mut predictions = vec![0.; train.n_rows()];
        let residuals = train.target.clone();
        let tree = RegressionTree::build(
            &train.features,
            &residuals,
            &params,
            |indices| sum_indices(&residuals, indices) / indices.len() as f64,
            &mut predictions,
        );
        let pred2 = tree.predict(&train.features).unwrap();
        assert_eq!(predictions, pred2);
        assert!(tree.depth() <= 6);

        let baseline = vec![mean(&train.target); train.n_rows()];
        assert!(rmse(&train.target, &pred2) < 0.5 * rmse(&train.target, &baseline));

        // Same input, same tree
        let tree2 = RegressionTree::fit(&train.features, &residuals, &params).unwrap();
        assert_eq!(tree, tree2);
    }
}
