//! Dataset loading and corpus-level cleaning
//!
//! Reads the tabular training dataset and applies the cleaning steps the
//! services share: column-name normalization, string normalization,
//! complete-row filtering, and two outlier policies (fixed threshold and
//! interquartile range). Everything here runs once at startup; failures
//! are fatal and the process never starts serving.

use crate::error::{AgroError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Load a CSV dataset with a header row.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .map_err(|e| AgroError::Data(format!("cannot read dataset {}: {}", path.display(), e)))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| AgroError::Data(format!("cannot parse dataset {}: {}", path.display(), e)))?;

    if df.height() == 0 {
        return Err(AgroError::Data(format!("dataset {} is empty", path.display())));
    }

    Ok(df)
}

/// Rename every column to its lowercase form so all services see one
/// canonical naming (the raw file mixes `Temperature`, `pH`, `Soil_color`).
pub fn lowercase_columns(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for name in names {
        let lower = name.to_lowercase();
        if lower != name {
            result.rename(&name, lower.into())?;
        }
    }
    Ok(result)
}

/// Trim and lowercase the named string columns in place.
pub fn normalize_strings(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let mut result = df.clone();
    for col_name in columns {
        let column = df
            .column(col_name)
            .map_err(|_| AgroError::MissingColumn(col_name.to_string()))?;
        let ca = column
            .str()
            .map_err(|e| AgroError::Data(format!("column {} is not a string column: {}", col_name, e)))?;

        let normalized: StringChunked = ca
            .into_iter()
            .map(|opt| opt.map(|s| s.trim().to_lowercase()))
            .collect();

        result = result
            .with_column(normalized.with_name((*col_name).into()).into_series())?
            .clone();
    }
    Ok(result)
}

/// Drop every row containing a null in any column.
pub fn drop_missing(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.drop_nulls::<String>(None)?)
}

/// Drop rows with a null in any of the named columns, leaving nulls in
/// other columns alone (the imputer handles those).
pub fn drop_missing_in(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let mut mask: Option<BooleanChunked> = None;
    for col_name in columns {
        let col = df
            .column(col_name)
            .map_err(|_| AgroError::MissingColumn(col_name.to_string()))?;
        let not_null = col.as_materialized_series().is_not_null();
        mask = Some(match mask {
            None => not_null,
            Some(m) => m & not_null,
        });
    }
    match mask {
        Some(m) => Ok(df.filter(&m)?),
        None => Ok(df.clone()),
    }
}

/// Fixed-threshold outlier filter: keep rows where `column <= bound`.
pub fn filter_at_most(df: &DataFrame, column: &str, bound: f64) -> Result<DataFrame> {
    let values = numeric_column(df, column)?;
    let mask: BooleanChunked = values
        .into_iter()
        .map(|opt| opt.map(|v| v <= bound))
        .collect();
    Ok(df.filter(&mask)?)
}

/// Interquartile-range outlier filter: keep rows where `column` falls in
/// `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`.
pub fn filter_iqr(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let values = numeric_column(df, column)?;
    let observed: Vec<f64> = values.into_iter().flatten().collect();
    if observed.is_empty() {
        return Err(AgroError::Data(format!("column {} has no observed values", column)));
    }

    let q1 = quantile(&observed, 0.25);
    let q3 = quantile(&observed, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let mask: BooleanChunked = values
        .into_iter()
        .map(|opt| opt.map(|v| v >= lower && v <= upper))
        .collect();
    Ok(df.filter(&mask)?)
}

/// Startup-fatal check that every named column exists in the dataset.
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for col_name in columns {
        if df.column(col_name).is_err() {
            return Err(AgroError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// A numeric column cast to Float64, with nulls preserved.
pub fn numeric_column(df: &DataFrame, column: &str) -> Result<Float64Chunked> {
    let col = df
        .column(column)
        .map_err(|_| AgroError::MissingColumn(column.to_string()))?;
    let casted = col
        .cast(&DataType::Float64)
        .map_err(|e| AgroError::Data(format!("column {} is not numeric: {}", column, e)))?;
    Ok(casted
        .as_materialized_series()
        .f64()
        .map_err(|e| AgroError::Data(e.to_string()))?
        .clone())
}

/// Linear-interpolated quantile of an unsorted slice, matching the
/// convention used when the outlier bounds were derived.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let low = pos.floor() as usize;
    let high = pos.ceil() as usize;
    let frac = pos - low as f64;
    sorted[low] * (1.0 - frac) + sorted[high] * frac
}
