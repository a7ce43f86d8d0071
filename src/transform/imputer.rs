//! Missing value imputation

use crate::dataset::numeric_column;
use crate::error::{AgroError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mean imputer for numeric columns.
///
/// At fit time, stores the mean of observed (non-missing) values per
/// column; at apply time, fills missing values with the stored mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanImputer {
    means: HashMap<String, f64>,
}

impl MeanImputer {
    /// Fit fill values on the designated columns of the training frame.
    pub fn fit(df: &DataFrame, columns: &[&str]) -> Result<Self> {
        let mut means = HashMap::new();
        for col_name in columns {
            let ca = numeric_column(df, col_name)?;
            let mean = ca
                .mean()
                .ok_or_else(|| AgroError::Data(format!("column {} has no observed values", col_name)))?;
            means.insert(col_name.to_string(), mean);
        }
        Ok(Self { means })
    }

    /// Stored fill value for a column.
    pub fn fill_value(&self, column: &str) -> Result<f64> {
        self.means
            .get(column)
            .copied()
            .ok_or_else(|| AgroError::MissingColumn(column.to_string()))
    }

    /// Fill a possibly-missing value.
    pub fn impute(&self, column: &str, value: Option<f64>) -> Result<f64> {
        match value {
            Some(v) => Ok(v),
            None => self.fill_value(column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_skips_nulls() {
        let df = DataFrame::new(vec![Series::new(
            "ph".into(),
            &[Some(6.0), None, Some(8.0)],
        )
        .into()])
        .unwrap();

        let imputer = MeanImputer::fit(&df, &["ph"]).unwrap();
        assert!((imputer.fill_value("ph").unwrap() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_impute_passes_through_observed() {
        let df = DataFrame::new(vec![Series::new("ph".into(), &[6.0, 8.0]).into()]).unwrap();
        let imputer = MeanImputer::fit(&df, &["ph"]).unwrap();

        assert_eq!(imputer.impute("ph", Some(6.5)).unwrap(), 6.5);
        assert!((imputer.impute("ph", None).unwrap() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_column_errors() {
        let df = DataFrame::new(vec![Series::new("ph".into(), &[6.0]).into()]).unwrap();
        let imputer = MeanImputer::fit(&df, &["ph"]).unwrap();
        assert!(imputer.fill_value("rainfall").is_err());
    }
}
