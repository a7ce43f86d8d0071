//! Gradient-boosted classification trees
//!
//! Multiclass boosting with a one-vs-rest log-odds ensemble: each round
//! fits one regression tree per class on the softmax residuals. Used by
//! the fertilizer service, where the label space is larger and the
//! feature matrix wider than for the crop classifier.

use super::decision_tree::{DecisionTree, Task, TreeParams};
use crate::error::{AgroError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 0.1,
            max_depth: 4,
            min_samples_leaf: 1,
        }
    }
}

/// Multiclass gradient-boosted classifier over dense integer class codes
/// `0..n_classes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedClassifier {
    params: BoostingParams,
    n_classes: usize,
    /// Per-class prior log-odds.
    base_scores: Vec<f64>,
    /// `rounds[r][k]` is round r's tree for class k.
    rounds: Vec<Vec<DecisionTree>>,
}

impl BoostedClassifier {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            n_classes: 0,
            base_scores: Vec::new(),
            rounds: Vec::new(),
        }
    }

    /// Fit on class codes. `y` must contain dense codes `0..n_classes`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(AgroError::Shape {
                expected: format!("{} target values", n_samples),
                actual: format!("{} target values", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(AgroError::Training("cannot boost on zero samples".to_string()));
        }

        let labels: Vec<usize> = y.iter().map(|&v| v.round() as usize).collect();
        self.n_classes = labels.iter().max().map_or(0, |m| m + 1);
        if self.n_classes < 2 {
            return Err(AgroError::Training(format!(
                "need at least 2 classes, got {}",
                self.n_classes
            )));
        }

        // Prior log-odds from class frequencies.
        let mut class_counts = vec![0usize; self.n_classes];
        for &label in &labels {
            class_counts[label] += 1;
        }
        self.base_scores = class_counts
            .iter()
            .map(|&c| {
                let p = (c as f64 / n_samples as f64).clamp(1e-10, 1.0 - 1e-10);
                p.ln()
            })
            .collect();

        let tree_params = TreeParams {
            max_depth: Some(self.params.max_depth),
            min_samples_split: 2,
            min_samples_leaf: self.params.min_samples_leaf,
        };

        // scores[[i, k]]: accumulated log-odds for sample i, class k.
        let mut scores = Array2::zeros((n_samples, self.n_classes));
        for mut row in scores.rows_mut() {
            for (k, &b) in self.base_scores.iter().enumerate() {
                row[k] = b;
            }
        }

        self.rounds = Vec::with_capacity(self.params.n_estimators);
        for _ in 0..self.params.n_estimators {
            let probs = softmax_rows(&scores);

            let mut round = Vec::with_capacity(self.n_classes);
            for k in 0..self.n_classes {
                // Residual of the softmax cross-entropy gradient.
                let residuals = Array1::from_iter((0..n_samples).map(|i| {
                    let target = if labels[i] == k { 1.0 } else { 0.0 };
                    target - probs[[i, k]]
                }));

                let mut tree = DecisionTree::new(Task::Regression, tree_params);
                tree.fit(x, &residuals)?;

                let updates = tree.predict(x)?;
                for i in 0..n_samples {
                    scores[[i, k]] += self.params.learning_rate * updates[i];
                }
                round.push(tree);
            }
            self.rounds.push(round);
        }

        Ok(self)
    }

    /// Per-class scores for one feature vector.
    fn scores_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if self.rounds.is_empty() {
            return Err(AgroError::NotFitted);
        }
        let mut scores = self.base_scores.clone();
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                scores[k] += self.params.learning_rate * tree.predict_row(row)?;
            }
        }
        Ok(scores)
    }

    /// Predicted class code for one feature vector.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let scores = self.scores_row(row)?;
        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, _)| k)
            .unwrap_or(0);
        Ok(best as f64)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut out = Array1::zeros(x.nrows());
        for i in 0..x.nrows() {
            let row = x.row(i).to_vec();
            out[i] = self.predict_row(&row)?;
        }
        Ok(out)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn softmax_rows(scores: &Array2<f64>) -> Array2<f64> {
    let mut out = scores.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for v in row.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
    out
}
