//! Evaluation metrics
//!
//! Reported for observability at startup; never used as a serving gate.

use ndarray::Array1;

/// Fraction of predictions matching the true class code.
pub fn accuracy(truth: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| (t.round() - p.round()).abs() < 0.5)
        .count();
    correct as f64 / truth.len() as f64
}

/// Mean squared error.
pub fn mean_squared_error(truth: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    truth
        .iter()
        .zip(predicted.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let truth = array![0.0, 1.0, 2.0, 1.0];
        let predicted = array![0.0, 1.0, 1.0, 1.0];
        assert!((accuracy(&truth, &predicted) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_mse() {
        let truth = array![1.0, 2.0, 3.0];
        let predicted = array![1.0, 2.0, 6.0];
        assert!((mean_squared_error(&truth, &predicted) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_inputs() {
        let empty: Array1<f64> = array![];
        assert_eq!(accuracy(&empty, &empty), 0.0);
        assert_eq!(mean_squared_error(&empty, &empty), 0.0);
    }
}
