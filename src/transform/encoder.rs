//! Categorical encoders
//!
//! Two schemes with deliberately different unseen-category behavior.
//! One-hot degrades to an all-zero block ("none of the known categories"),
//! which a tree model can absorb. Label encoding must fail instead: an
//! arbitrary integer for an unseen category would be silently meaningful
//! to the model.

use crate::error::{AgroError, Result};
use crate::record::normalize_category;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

fn distinct_sorted_categories(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let col = df
        .column(column)
        .map_err(|_| AgroError::MissingColumn(column.to_string()))?;
    let ca = col
        .str()
        .map_err(|e| AgroError::Data(format!("column {} is not a string column: {}", column, e)))?;

    let mut categories: Vec<String> = ca
        .into_iter()
        .flatten()
        .map(normalize_category)
        .collect();
    categories.sort();
    categories.dedup();

    if categories.is_empty() {
        return Err(AgroError::Data(format!("column {} has no observed categories", column)));
    }
    Ok(categories)
}

/// One-hot encoder with drop-first semantics.
///
/// The derived columns are `<column>_<category>` for every category after
/// the first in sorted order. The first category encodes as all zeros, and
/// so does any category never seen during fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit(df: &DataFrame, column: &str) -> Result<Self> {
        Ok(Self {
            column: column.to_string(),
            categories: distinct_sorted_categories(df, column)?,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Names of the derived boolean columns, in canonical order.
    pub fn derived_columns(&self) -> Vec<String> {
        self.categories
            .iter()
            .skip(1)
            .map(|cat| format!("{}_{}", self.column, cat))
            .collect()
    }

    /// Encode one normalized value into the derived columns. Unseen
    /// categories (and the dropped first category) yield all zeros.
    pub fn encode(&self, value: &str) -> Vec<f64> {
        let normalized = normalize_category(value);
        self.categories
            .iter()
            .skip(1)
            .map(|cat| if *cat == normalized { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Label encoder: dense integers assigned in the stable sort order of the
/// category strings. The vocabulary is frozen after fit; encoding an
/// unseen value is an explicit error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    vocabulary: Vec<String>,
}

impl LabelEncoder {
    pub fn fit(df: &DataFrame, column: &str) -> Result<Self> {
        Ok(Self {
            column: column.to_string(),
            vocabulary: distinct_sorted_categories(df, column)?,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Dense integer code for a category; fails on anything outside the
    /// frozen vocabulary, naming the offending column and value.
    pub fn encode(&self, value: &str) -> Result<f64> {
        let normalized = normalize_category(value);
        self.vocabulary
            .binary_search(&normalized)
            .map(|idx| idx as f64)
            .map_err(|_| AgroError::UnknownCategory {
                column: self.column.clone(),
                value: normalized,
            })
    }

    /// Category string for a predicted code (rounded to the nearest index).
    pub fn decode(&self, code: f64) -> Result<&str> {
        let idx = code.round() as usize;
        self.vocabulary
            .get(idx)
            .map(|s| s.as_str())
            .ok_or_else(|| AgroError::Data(format!(
                "predicted label code {} is outside the {} vocabulary ({} classes)",
                code,
                self.column,
                self.vocabulary.len()
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_frame() -> DataFrame {
        DataFrame::new(vec![Series::new(
            "soil_color".into(),
            &["red", "black", " Red ", "brown", "BLACK"],
        )
        .into()])
        .unwrap()
    }

    #[test]
    fn test_one_hot_drop_first() {
        let encoder = OneHotEncoder::fit(&color_frame(), "soil_color").unwrap();
        // Sorted categories: black, brown, red; black is dropped.
        assert_eq!(
            encoder.derived_columns(),
            vec!["soil_color_brown", "soil_color_red"]
        );

        assert_eq!(encoder.encode("red"), vec![0.0, 1.0]);
        assert_eq!(encoder.encode("brown"), vec![1.0, 0.0]);
        // Dropped first category: all zeros.
        assert_eq!(encoder.encode("black"), vec![0.0, 0.0]);
    }

    #[test]
    fn test_one_hot_unseen_is_all_zero() {
        let encoder = OneHotEncoder::fit(&color_frame(), "soil_color").unwrap();
        assert_eq!(encoder.encode("purple"), vec![0.0, 0.0]);
    }

    #[test]
    fn test_one_hot_normalizes_input() {
        let encoder = OneHotEncoder::fit(&color_frame(), "soil_color").unwrap();
        assert_eq!(encoder.encode("  RED "), vec![0.0, 1.0]);
    }

    #[test]
    fn test_label_stable_sort_order() {
        let encoder = LabelEncoder::fit(&color_frame(), "soil_color").unwrap();
        assert_eq!(encoder.vocabulary(), &["black", "brown", "red"]);
        assert_eq!(encoder.encode("black").unwrap(), 0.0);
        assert_eq!(encoder.encode("red").unwrap(), 2.0);
    }

    #[test]
    fn test_label_unseen_fails() {
        let encoder = LabelEncoder::fit(&color_frame(), "soil_color").unwrap();
        let err = encoder.encode("purple").unwrap_err();
        assert!(matches!(
            err,
            AgroError::UnknownCategory { ref column, ref value }
                if column == "soil_color" && value == "purple"
        ));
    }

    #[test]
    fn test_label_round_trip() {
        let encoder = LabelEncoder::fit(&color_frame(), "soil_color").unwrap();
        for cat in ["black", "brown", "red"] {
            let code = encoder.encode(cat).unwrap();
            assert_eq!(encoder.decode(code).unwrap(), cat);
        }
    }

    #[test]
    fn test_label_decode_out_of_range() {
        let encoder = LabelEncoder::fit(&color_frame(), "soil_color").unwrap();
        assert!(encoder.decode(17.0).is_err());
    }
}
