//! Bootstrap-aggregated forests

use super::decision_tree::{DecisionTree, Task, TreeParams};
use crate::error::{AgroError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Forest hyperparameters, the axes the grid search explores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// Random forest: bootstrap-sampled CART trees built in parallel, with
/// majority voting for classification and averaging for regression.
/// Per-tree seeds derive from the base seed, so fitting is reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    task: Task,
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(task: Task, params: ForestParams) -> Self {
        Self {
            task,
            params,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(AgroError::Shape {
                expected: format!("{} target values", n_samples),
                actual: format!("{} target values", y.len()),
            });
        }

        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
        };
        let base_seed = self.params.seed;
        let task = self.task;

        let trees: Result<Vec<DecisionTree>> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = (0..n_samples)
                    .map(|_| rng.next_u64() as usize % n_samples)
                    .collect();

                let x_boot = x.select(Axis(0), &sample);
                let y_boot = Array1::from_iter(sample.iter().map(|&i| y[i]));

                let mut tree = DecisionTree::new(task, tree_params);
                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        Ok(self)
    }

    /// Aggregate prediction for one feature vector.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(AgroError::NotFitted);
        }
        let votes: Result<Vec<f64>> = self.trees.iter().map(|t| t.predict_row(row)).collect();
        let votes = votes?;

        Ok(match self.task {
            Task::Classification => {
                let mut counts: HashMap<i64, usize> = HashMap::new();
                for v in &votes {
                    *counts.entry(v.round() as i64).or_insert(0) += 1;
                }
                counts
                    .into_iter()
                    .max_by_key(|&(class, count)| (count, std::cmp::Reverse(class)))
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            }
            Task::Regression => votes.iter().sum::<f64>() / votes.len() as f64,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut out = Array1::zeros(x.nrows());
        for i in 0..x.nrows() {
            let row = x.row(i).to_vec();
            out[i] = self.predict_row(&row)?;
        }
        Ok(out)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Multi-output regression as one forest per target, holding the output
/// order fixed and documented (the serving layer maps outputs to named
/// fields by this order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiOutputForest {
    targets: Vec<String>,
    forests: Vec<RandomForest>,
}

impl MultiOutputForest {
    /// Fit one regressor forest per column of `y`, in target order.
    pub fn fit(targets: &[&str], params: ForestParams, x: &Array2<f64>, y: &Array2<f64>) -> Result<Self> {
        if y.ncols() != targets.len() {
            return Err(AgroError::Shape {
                expected: format!("{} target columns", targets.len()),
                actual: format!("{} target columns", y.ncols()),
            });
        }

        let forests: Result<Vec<RandomForest>> = (0..targets.len())
            .map(|t| {
                let column = y.column(t).to_owned();
                let mut forest = RandomForest::new(Task::Regression, params);
                forest.fit(x, &column)?;
                Ok(forest)
            })
            .collect();

        Ok(Self {
            targets: targets.iter().map(|s| s.to_string()).collect(),
            forests: forests?,
        })
    }

    /// Declared output order.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Predict all targets for one feature vector, in declared order.
    pub fn predict_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.forests.iter().map(|f| f.predict_row(row)).collect()
    }

    /// Predict all targets for every row; output columns follow target order.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((x.nrows(), self.targets.len()));
        for (t, forest) in self.forests.iter().enumerate() {
            let column = forest.predict(x)?;
            out.column_mut(t).assign(&column);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_accuracy() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let params = ForestParams { n_estimators: 15, ..ForestParams::default() };
        let mut forest = RandomForest::new(Task::Classification, params);
        forest.fit(&x, &y).unwrap();

        let predictions = forest.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        assert!(correct >= 5, "only {} of 6 correct", correct);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let params = ForestParams { n_estimators: 10, ..ForestParams::default() };
        let mut a = RandomForest::new(Task::Regression, params);
        let mut b = RandomForest::new(Task::Regression, params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let query = array![[2.5], [4.5]];
        assert_eq!(a.predict(&query).unwrap(), b.predict(&query).unwrap());
    }

    #[test]
    fn test_unfitted_fails() {
        let forest = RandomForest::new(Task::Regression, ForestParams::default());
        assert!(matches!(forest.predict_row(&[1.0]), Err(AgroError::NotFitted)));
    }

    #[test]
    fn test_multi_output_order() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        // First target increases, second decreases.
        let y = array![
            [1.0, 60.0],
            [2.0, 50.0],
            [3.0, 40.0],
            [4.0, 30.0],
            [5.0, 20.0],
            [6.0, 10.0],
        ];

        let params = ForestParams { n_estimators: 20, ..ForestParams::default() };
        let model = MultiOutputForest::fit(&["up", "down"], params, &x, &y).unwrap();
        assert_eq!(model.targets(), &["up", "down"]);

        let low = model.predict_row(&[1.5]).unwrap();
        let high = model.predict_row(&[5.5]).unwrap();
        assert!(low[0] < high[0], "first output should increase");
        assert!(low[1] > high[1], "second output should decrease");
    }

    #[test]
    fn test_multi_output_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![[1.0], [2.0]];
        let err = MultiOutputForest::fit(&["a", "b"], ForestParams::default(), &x, &y).unwrap_err();
        assert!(matches!(err, AgroError::Shape { .. }));
    }
}
