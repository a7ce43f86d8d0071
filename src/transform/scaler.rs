//! Standardization over the assembled feature matrix

use crate::error::{AgroError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Per-column standardization parameters fitted on the training matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnParams {
    mean: f64,
    std: f64,
}

/// Standard scaler: `(x - mean) / std` per column, fitted after encoding
/// over the full numeric+encoded matrix. Zero-variance columns scale by
/// 1.0 so constant features pass through centered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ColumnParams>,
}

impl StandardScaler {
    /// Fit per-column mean and standard deviation (sample std, ddof 1).
    pub fn fit(matrix: &Array2<f64>) -> Result<Self> {
        let n_rows = matrix.nrows();
        if n_rows == 0 {
            return Err(AgroError::Data("cannot fit scaler on an empty matrix".to_string()));
        }

        let params = matrix
            .columns()
            .into_iter()
            .map(|col| {
                let mean = col.sum() / n_rows as f64;
                let std = if n_rows < 2 {
                    1.0
                } else {
                    let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                        / (n_rows - 1) as f64;
                    var.sqrt()
                };
                ColumnParams {
                    mean,
                    std: if std == 0.0 { 1.0 } else { std },
                }
            })
            .collect();

        Ok(Self { params })
    }

    pub fn n_columns(&self) -> usize {
        self.params.len()
    }

    /// Scale one row vector in place.
    pub fn scale_vector(&self, vector: &mut Array1<f64>) -> Result<()> {
        if vector.len() != self.params.len() {
            return Err(AgroError::Shape {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", vector.len()),
            });
        }
        for (value, p) in vector.iter_mut().zip(&self.params) {
            *value = (*value - p.mean) / p.std;
        }
        Ok(())
    }

    /// Scale a full matrix, column-wise.
    pub fn scale_matrix(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        if matrix.ncols() != self.params.len() {
            return Err(AgroError::Shape {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", matrix.ncols()),
            });
        }
        let mut scaled = matrix.clone();
        for (mut col, p) in scaled.columns_mut().into_iter().zip(&self.params) {
            col.mapv_inplace(|v| (v - p.mean) / p.std);
        }
        Ok(scaled)
    }
}
