//! The fitted preprocessing pipeline and its canonical schema

use super::encoder::{LabelEncoder, OneHotEncoder};
use super::imputer::MeanImputer;
use super::scaler::StandardScaler;
use crate::dataset::numeric_column;
use crate::error::{AgroError, Result};
use crate::record::{normalize_category, FeatureRecord};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Declared role of one input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnSpec {
    /// Numeric column: mean-imputed, passed through in declared order.
    Numeric(String),
    /// Categorical column encoded as drop-first indicator columns.
    OneHot(String),
    /// Categorical column encoded as a dense integer from a frozen vocabulary.
    Label(String),
}

impl ColumnSpec {
    pub fn name(&self) -> &str {
        match self {
            ColumnSpec::Numeric(n) | ColumnSpec::OneHot(n) | ColumnSpec::Label(n) => n,
        }
    }
}

/// Ordered declaration of a model's input columns. The declared order is
/// the sole source of the canonical schema order; nothing depends on map
/// iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformSpec {
    columns: Vec<ColumnSpec>,
}

impl TransformSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric(mut self, name: &str) -> Self {
        self.columns.push(ColumnSpec::Numeric(name.to_string()));
        self
    }

    pub fn one_hot(mut self, name: &str) -> Self {
        self.columns.push(ColumnSpec::OneHot(name.to_string()));
        self
    }

    pub fn label(mut self, name: &str) -> Self {
        self.columns.push(ColumnSpec::Label(name.to_string()));
        self
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Names of all declared input columns, in declared order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }
}

/// A fitted categorical encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Encoding {
    OneHot(OneHotEncoder),
    Label(LabelEncoder),
}

impl Encoding {
    fn column(&self) -> &str {
        match self {
            Encoding::OneHot(e) => e.column(),
            Encoding::Label(e) => e.column(),
        }
    }
}

/// The frozen train/serve transformation.
///
/// Owns the impute means, the per-column encodings, the canonical ordered
/// schema, and the scaler parameters. Created once from training data and
/// immutable thereafter; [`apply`](Self::apply) re-runs the identical
/// transformation on a single raw record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedTransform {
    spec: TransformSpec,
    imputer: MeanImputer,
    encodings: Vec<Encoding>,
    schema: Vec<String>,
    scaler: StandardScaler,
}

impl FittedTransform {
    /// Fit the pipeline on a cleaned training frame.
    ///
    /// Returns the frozen transform together with the scaled training
    /// matrix in canonical schema order, built row-by-row through the same
    /// code path that serves single records.
    pub fn fit(spec: TransformSpec, df: &DataFrame) -> Result<(Self, Array2<f64>)> {
        let numeric_cols: Vec<&str> = spec
            .columns()
            .iter()
            .filter_map(|c| match c {
                ColumnSpec::Numeric(n) => Some(n.as_str()),
                _ => None,
            })
            .collect();
        let imputer = MeanImputer::fit(df, &numeric_cols)?;

        let mut encodings = Vec::new();
        for col in spec.columns() {
            match col {
                ColumnSpec::OneHot(name) => {
                    encodings.push(Encoding::OneHot(OneHotEncoder::fit(df, name)?));
                }
                ColumnSpec::Label(name) => {
                    encodings.push(Encoding::Label(LabelEncoder::fit(df, name)?));
                }
                ColumnSpec::Numeric(_) => {}
            }
        }

        // Canonical schema: pass-through columns (numeric and label) in
        // declared order, then indicator blocks per one-hot column in
        // declared order with categories in sorted order.
        let mut schema: Vec<String> = Vec::new();
        for col in spec.columns() {
            match col {
                ColumnSpec::Numeric(name) | ColumnSpec::Label(name) => schema.push(name.clone()),
                ColumnSpec::OneHot(_) => {}
            }
        }
        for enc in &encodings {
            if let Encoding::OneHot(e) = enc {
                schema.extend(e.derived_columns());
            }
        }

        let mut unfitted = Self {
            spec,
            imputer,
            encodings,
            schema,
            scaler: StandardScaler::fit(&Array2::zeros((1, 0)))?,
        };

        // Materialize the unscaled training matrix through the per-record
        // path so batch fitting and request serving cannot diverge.
        let records = unfitted.records_from_frame(df)?;
        let n_cols = unfitted.schema.len();
        let mut matrix = Array2::zeros((records.len(), n_cols));
        for (i, record) in records.iter().enumerate() {
            let row = unfitted.raw_vector(record)?;
            matrix.row_mut(i).assign(&row);
        }

        unfitted.scaler = StandardScaler::fit(&matrix)?;
        let scaled = unfitted.scaler.scale_matrix(&matrix)?;
        Ok((unfitted, scaled))
    }

    /// The canonical ordered column schema established at fit time.
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Fields a request must carry to be transformable.
    pub fn required_fields(&self) -> Vec<&str> {
        self.spec.column_names()
    }

    /// Label encoder for a column, when that column is label-encoded.
    pub fn label_encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.encodings.iter().find_map(|e| match e {
            Encoding::Label(enc) if enc.column() == column => Some(enc),
            _ => None,
        })
    }

    /// Transform one raw record into a model-ready vector: impute, encode
    /// with the frozen schemes, order by the canonical schema, scale.
    pub fn apply(&self, record: &FeatureRecord) -> Result<Array1<f64>> {
        let mut vector = self.raw_vector(record)?;
        self.scaler.scale_vector(&mut vector)?;
        Ok(vector)
    }

    /// Batch transform of a cleaned frame, row-for-row identical to
    /// [`apply`](Self::apply) on the corresponding single records.
    pub fn transform_frame(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let records = self.records_from_frame(df)?;
        let mut matrix = Array2::zeros((records.len(), self.schema.len()));
        for (i, record) in records.iter().enumerate() {
            let row = self.apply(record)?;
            matrix.row_mut(i).assign(&row);
        }
        Ok(matrix)
    }

    /// Unscaled feature vector in canonical schema order.
    fn raw_vector(&self, record: &FeatureRecord) -> Result<Array1<f64>> {
        let mut values = Vec::with_capacity(self.schema.len());

        // Pass-through columns in declared order.
        for col in self.spec.columns() {
            match col {
                ColumnSpec::Numeric(name) => {
                    values.push(self.imputer.impute(name, record.number(name)?)?);
                }
                ColumnSpec::Label(name) => {
                    let encoder = self
                        .label_encoder(name)
                        .ok_or_else(|| AgroError::MissingColumn(name.clone()))?;
                    values.push(encoder.encode(record.text(name)?)?);
                }
                ColumnSpec::OneHot(_) => {}
            }
        }

        // Indicator blocks in declared one-hot order. A category absent
        // from the frozen scheme contributes zeros for its whole block.
        for enc in &self.encodings {
            if let Encoding::OneHot(e) = enc {
                values.extend(e.encode(record.text(e.column())?));
            }
        }

        Ok(Array1::from_vec(values))
    }

    /// Convert a frame's rows into raw records through the declared spec,
    /// so fit-time data flows through the serving-time code path. Nulls in
    /// numeric columns are left absent (the imputer fills them).
    fn records_from_frame(&self, df: &DataFrame) -> Result<Vec<FeatureRecord>> {
        enum Accessor {
            Numeric(Float64Chunked),
            Text(StringChunked),
        }

        let mut accessors: Vec<(String, Accessor)> = Vec::new();
        for col in self.spec.columns() {
            let name = col.name();
            match col {
                ColumnSpec::Numeric(_) => {
                    accessors.push((name.to_string(), Accessor::Numeric(numeric_column(df, name)?)));
                }
                ColumnSpec::OneHot(_) | ColumnSpec::Label(_) => {
                    let ca = df
                        .column(name)
                        .map_err(|_| AgroError::MissingColumn(name.to_string()))?
                        .str()
                        .map_err(|e| {
                            AgroError::Data(format!("column {} is not a string column: {}", name, e))
                        })?
                        .clone();
                    accessors.push((name.to_string(), Accessor::Text(ca)));
                }
            }
        }

        let mut records = Vec::with_capacity(df.height());
        for row_idx in 0..df.height() {
            let mut record = FeatureRecord::new();
            for (name, accessor) in &accessors {
                match accessor {
                    Accessor::Numeric(ca) => {
                        if let Some(v) = ca.get(row_idx) {
                            record = record.with_number(name, v);
                        }
                    }
                    Accessor::Text(ca) => {
                        if let Some(s) = ca.get(row_idx) {
                            record = record.with_text(name, &normalize_category(s));
                        }
                    }
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}
