//! Raw feature records as received from callers

use crate::error::{AgroError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A single field value in an untyped request payload.
///
/// JSON numbers map to `Number`, strings to `Text`, and explicit nulls to
/// `Null` (treated as a missing value, not a missing field).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Null,
}

/// A raw record: named fields with numeric or categorical values.
///
/// This is the untyped boundary type; [`FittedTransform::apply`] turns it
/// into a model-ready feature vector.
///
/// [`FittedTransform::apply`]: crate::transform::FittedTransform::apply
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(pub BTreeMap<String, FieldValue>);

impl FeatureRecord {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_number(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), FieldValue::Number(value));
        self
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), FieldValue::Text(value.to_string()));
        self
    }

    /// Whether the field is present with a non-null value.
    pub fn has_value(&self, name: &str) -> bool {
        !matches!(self.0.get(name), None | Some(FieldValue::Null))
    }

    /// Numeric value of a field. `Ok(None)` when the field is absent or
    /// null (the caller imputes); an error when it holds text.
    pub fn number(&self, name: &str) -> Result<Option<f64>> {
        match self.0.get(name) {
            Some(FieldValue::Number(v)) if v.is_finite() => Ok(Some(*v)),
            Some(FieldValue::Number(_)) | Some(FieldValue::Null) | None => Ok(None),
            Some(FieldValue::Text(_)) => Err(AgroError::FieldType {
                field: name.to_string(),
                expected: "number",
            }),
        }
    }

    /// Text value of a field; absent or null is a missing-field error
    /// (categorical values cannot be imputed at serving time).
    pub fn text(&self, name: &str) -> Result<&str> {
        match self.0.get(name) {
            Some(FieldValue::Text(s)) => Ok(s),
            Some(FieldValue::Number(_)) => Err(AgroError::FieldType {
                field: name.to_string(),
                expected: "string",
            }),
            Some(FieldValue::Null) | None => Err(AgroError::MissingField(name.to_string())),
        }
    }

    /// Check that every required field is present with a value.
    pub fn require_fields<'a, I>(&self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for field in fields {
            if !self.has_value(field) {
                return Err(AgroError::MissingField(field.to_string()));
            }
        }
        Ok(())
    }
}

/// Normalize a categorical string the same way at fit and apply time.
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_mixed_payload() {
        let json = r#"{"temperature": 25.5, "soil_color": "Red", "ph": null}"#;
        let record: FeatureRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.number("temperature").unwrap(), Some(25.5));
        assert_eq!(record.text("soil_color").unwrap(), "Red");
        assert_eq!(record.number("ph").unwrap(), None);
        assert!(!record.has_value("ph"));
    }

    #[test]
    fn test_number_rejects_text() {
        let record = FeatureRecord::new().with_text("temperature", "warm");
        assert!(matches!(
            record.number("temperature"),
            Err(AgroError::FieldType { .. })
        ));
    }

    #[test]
    fn test_text_rejects_missing() {
        let record = FeatureRecord::new();
        assert!(matches!(
            record.text("soil_color"),
            Err(AgroError::MissingField(_))
        ));
    }

    #[test]
    fn test_require_fields() {
        let record = FeatureRecord::new()
            .with_number("temperature", 25.0)
            .with_text("soil_color", "red");

        assert!(record.require_fields(["temperature", "soil_color"]).is_ok());
        let err = record.require_fields(["temperature", "ph"]).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: ph");
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("  Red  "), "red");
        assert_eq!(normalize_category("BLACK"), "black");
    }
}
