//! Train/test splitting, cross-validation, and grid search

use super::decision_tree::Task;
use super::metrics::{accuracy, mean_squared_error};
use super::random_forest::{ForestParams, RandomForest};
use crate::error::{AgroError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Shuffled train/test partition with a fixed ratio and seed.
pub fn train_test_split(n_samples: usize, test_ratio: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_ratio) || test_ratio == 0.0 {
        return Err(AgroError::Training(format!(
            "test_ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }
    let n_test = ((n_samples as f64) * test_ratio).round() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(AgroError::Training(format!(
            "cannot split {} samples with test_ratio {}",
            n_samples, test_ratio
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test = indices.split_off(n_samples - n_test);
    Ok((indices, test))
}

/// Shuffled k-fold splitter with a fixed seed.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Produce `(train, test)` index pairs covering every sample exactly
    /// once on the test side.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(AgroError::Training("need at least 2 folds".to_string()));
        }
        if n_samples < self.n_splits {
            return Err(AgroError::Training(format!(
                "{} samples cannot be split into {} folds",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = n_samples / self.n_splits + usize::from(fold < n_samples % self.n_splits);
            let test: Vec<usize> = indices[start..start + size].to_vec();
            let train: Vec<usize> = indices[..start]
                .iter()
                .chain(indices[start + size..].iter())
                .copied()
                .collect();
            splits.push((train, test));
            start += size;
        }
        Ok(splits)
    }
}

/// Declared hyperparameter space for forest grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl ForestParamGrid {
    /// A single-candidate grid (no search, just the given parameters).
    pub fn single(params: ForestParams) -> Self {
        Self {
            n_estimators: vec![params.n_estimators],
            max_depth: vec![params.max_depth],
            min_samples_split: vec![params.min_samples_split],
            min_samples_leaf: vec![params.min_samples_leaf],
        }
    }

    /// All parameter combinations, in deterministic declaration order.
    pub fn candidates(&self, seed: u64) -> Vec<ForestParams> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    for &min_samples_leaf in &self.min_samples_leaf {
                        out.push(ForestParams {
                            n_estimators,
                            max_depth,
                            min_samples_split,
                            min_samples_leaf,
                            seed,
                        });
                    }
                }
            }
        }
        out
    }
}

/// Outcome of a grid search: the winning parameters and their
/// cross-validated score (accuracy for classification, MSE for
/// regression).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub params: ForestParams,
    pub cv_score: f64,
}

/// Cross-validated grid search over forest hyperparameters.
///
/// Candidates are scored in parallel; selection is deterministic under a
/// fixed seed (ties keep the earliest candidate in grid order).
#[derive(Debug, Clone, Copy)]
pub struct GridSearch {
    pub n_folds: usize,
    pub seed: u64,
}

impl GridSearch {
    pub fn new(n_folds: usize, seed: u64) -> Self {
        Self { n_folds, seed }
    }

    /// Search the grid for the given task, returning the best candidate
    /// by mean cross-validated score.
    pub fn run(
        &self,
        task: Task,
        grid: &ForestParamGrid,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<SearchOutcome> {
        let candidates = grid.candidates(self.seed);
        if candidates.is_empty() {
            return Err(AgroError::Training("empty hyperparameter grid".to_string()));
        }
        let folds = KFold::new(self.n_folds, self.seed).split(x.nrows())?;

        let scored: Result<Vec<(usize, f64)>> = candidates
            .par_iter()
            .enumerate()
            .map(|(idx, &params)| {
                let mut fold_scores = Vec::with_capacity(folds.len());
                for (train_idx, test_idx) in &folds {
                    let x_train = x.select(Axis(0), train_idx);
                    let y_train = Array1::from_iter(train_idx.iter().map(|&i| y[i]));
                    let x_test = x.select(Axis(0), test_idx);
                    let y_test = Array1::from_iter(test_idx.iter().map(|&i| y[i]));

                    let mut forest = RandomForest::new(task, params);
                    forest.fit(&x_train, &y_train)?;
                    let predicted = forest.predict(&x_test)?;

                    fold_scores.push(match task {
                        Task::Classification => accuracy(&y_test, &predicted),
                        Task::Regression => mean_squared_error(&y_test, &predicted),
                    });
                }
                let mean = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                Ok((idx, mean))
            })
            .collect();
        let scored = scored?;

        // Accuracy is maximized, MSE minimized; earliest candidate wins ties.
        let best = scored
            .iter()
            .fold(None::<&(usize, f64)>, |best, entry| match best {
                None => Some(entry),
                Some(current) => {
                    let better = match task {
                        Task::Classification => entry.1 > current.1,
                        Task::Regression => entry.1 < current.1,
                    };
                    if better {
                        Some(entry)
                    } else {
                        Some(current)
                    }
                }
            })
            .copied()
            .ok_or_else(|| AgroError::Training("grid search produced no scores".to_string()))?;

        Ok(SearchOutcome {
            params: candidates[best.0],
            cv_score: best.1,
        })
    }
}
