//! CART decision trees

use crate::error::{AgroError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Learning task, determining impurity and leaf aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Gini impurity, majority-class leaves.
    Classification,
    /// Variance impurity, mean-value leaves.
    Regression,
}

/// Structural limits shared by single trees and forests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A single CART tree, the base learner for forests and boosting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    task: Task,
    params: TreeParams,
    root: Option<Node>,
    n_features: usize,
}

impl DecisionTree {
    pub fn new(task: Task, params: TreeParams) -> Self {
        Self {
            task,
            params,
            root: None,
            n_features: 0,
        }
    }

    /// Fit the tree on a feature matrix and target vector.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(AgroError::Shape {
                expected: format!("{} target values", x.nrows()),
                actual: format!("{} target values", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(AgroError::Training("cannot fit a tree on zero samples".to_string()));
        }

        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.grow(x, y, &indices, 0));
        Ok(self)
    }

    /// Predict a single feature vector.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(AgroError::NotFitted)?;
        loop {
            match node {
                Node::Leaf { value } => return Ok(*value),
                Node::Split { feature, threshold, left, right } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Predict every row of a matrix.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut out = Array1::zeros(x.nrows());
        for i in 0..x.nrows() {
            let row = x.row(i).to_vec();
            out[i] = self.predict_row(&row)?;
        }
        Ok(out)
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    fn grow(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], depth: usize) -> Node {
        let targets: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let at_depth_limit = self.params.max_depth.map_or(false, |d| depth >= d);
        if at_depth_limit
            || indices.len() < self.params.min_samples_split
            || is_uniform(&targets)
        {
            return Node::Leaf { value: self.leaf_value(&targets) };
        }

        let Some((feature, threshold)) = self.best_split(x, y, indices) else {
            return Node::Leaf { value: self.leaf_value(&targets) };
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

        if left_idx.len() < self.params.min_samples_leaf
            || right_idx.len() < self.params.min_samples_leaf
        {
            return Node::Leaf { value: self.leaf_value(&targets) };
        }

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.grow(x, y, &left_idx, depth + 1)),
            right: Box::new(self.grow(x, y, &right_idx, depth + 1)),
        }
    }

    /// Scan every feature for the midpoint threshold with the largest
    /// impurity decrease.
    fn best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Option<(usize, f64)> {
        let parent: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&parent);
        let n = indices.len() as f64;

        let mut best: Option<(usize, f64, f64)> = None;

        for feature in 0..x.ncols() {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;

                let mut left = Vec::new();
                let mut right = Vec::new();
                for &i in indices {
                    if x[[i, feature]] <= threshold {
                        left.push(y[i]);
                    } else {
                        right.push(y[i]);
                    }
                }

                if left.len() < self.params.min_samples_leaf
                    || right.len() < self.params.min_samples_leaf
                {
                    continue;
                }

                let weighted = (left.len() as f64 * self.impurity(&left)
                    + right.len() as f64 * self.impurity(&right))
                    / n;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, threshold, gain));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    fn impurity(&self, targets: &[f64]) -> f64 {
        match self.task {
            Task::Classification => gini(targets),
            Task::Regression => variance(targets),
        }
    }

    fn leaf_value(&self, targets: &[f64]) -> f64 {
        match self.task {
            Task::Classification => majority_class(targets),
            Task::Regression => mean(targets),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn gini(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &v in values {
        *counts.entry(v.round() as i64).or_insert(0) += 1;
    }
    let n = values.len() as f64;
    1.0 - counts.values().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

fn majority_class(values: &[f64]) -> f64 {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &v in values {
        *counts.entry(v.round() as i64).or_insert(0) += 1;
    }
    counts
        .into_iter()
        // Tie-break on the class code for determinism.
        .max_by_key(|&(class, count)| (count, std::cmp::Reverse(class)))
        .map(|(class, _)| class as f64)
        .unwrap_or(0.0)
}

fn is_uniform(values: &[f64]) -> bool {
    values
        .first()
        .map_or(true, |&first| values.iter().all(|&v| (v - first).abs() < 1e-12))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![[0.0], [0.1], [0.2], [1.0], [1.1], [1.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(Task::Classification, TreeParams::default());
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_regressor_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 50.0, 50.0, 50.0];

        let mut tree = DecisionTree::new(Task::Regression, TreeParams::default());
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict_row(&[2.0]).unwrap(), 5.0);
        assert_eq!(tree.predict_row(&[11.0]).unwrap(), 50.0);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let params = TreeParams { max_depth: Some(2), ..TreeParams::default() };
        let mut tree = DecisionTree::new(Task::Regression, params);
        tree.fit(&x, &y).unwrap();

        assert!(tree.depth() <= 3); // root split + one level + leaves
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let tree = DecisionTree::new(Task::Classification, TreeParams::default());
        assert!(matches!(tree.predict_row(&[1.0]), Err(AgroError::NotFitted)));
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let mut tree = DecisionTree::new(Task::Regression, TreeParams::default());
        assert!(matches!(tree.fit(&x, &y), Err(AgroError::Shape { .. })));
    }
}
