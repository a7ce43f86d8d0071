//! Soil nutrient requirement regression
//!
//! Predicts required nitrogen, phosphorus, and potassium levels from
//! climate, soil color, and the crop being grown. Both categorical
//! features are label-encoded: an unseen soil color or crop is an
//! explicit client error, because an arbitrary vocabulary index would be
//! silently meaningful to the forest.

use crate::dataset;
use crate::error::Result;
use crate::record::FeatureRecord;
use crate::training::{mean_squared_error, train_test_split, ForestParams, MultiOutputForest};
use crate::transform::{FittedTransform, TransformSpec};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

/// Output order is fixed and part of the serving contract: nitrogen,
/// phosphorus, potassium.
const TARGETS: [&str; 3] = ["nitrogen", "phosphorus", "potassium"];

/// Predicted nutrient levels, serialized with the original wire keys.
#[derive(Debug, Clone, Serialize)]
pub struct NutrientLevels {
    #[serde(rename = "Nitrogen")]
    pub nitrogen: f64,
    #[serde(rename = "Phosphorus")]
    pub phosphorus: f64,
    #[serde(rename = "Potassium")]
    pub potassium: f64,
}

/// Training-time knobs for the nutrient regressor.
#[derive(Debug, Clone)]
pub struct NutrientConfig {
    pub test_ratio: f64,
    pub params: ForestParams,
    /// Fixed upper bound applied to each target column before fitting.
    pub nutrient_bound: f64,
    pub rainfall_bound: f64,
    pub ph_bound: f64,
}

impl Default for NutrientConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            params: ForestParams { n_estimators: 100, ..ForestParams::default() },
            nutrient_bound: 100.0,
            rainfall_bound: 1500.0,
            ph_bound: 8.9,
        }
    }
}

/// The fitted nutrient requirement service.
pub struct NutrientService {
    transform: FittedTransform,
    model: MultiOutputForest,
    test_mse: [f64; 3],
}

impl NutrientService {
    pub fn fit(df: &DataFrame) -> Result<Self> {
        Self::fit_with(df, &NutrientConfig::default())
    }

    pub fn fit_with(df: &DataFrame, config: &NutrientConfig) -> Result<Self> {
        let df = dataset::lowercase_columns(df)?;
        dataset::require_columns(
            &df,
            &["temperature", "rainfall", "soil_color", "ph", "crop",
              TARGETS[0], TARGETS[1], TARGETS[2]],
        )?;
        let df = dataset::normalize_strings(&df, &["soil_color", "crop"])?;
        let df = dataset::drop_missing(&df)?;

        // Outlier policies carried over from the source dataset analysis:
        // fixed bounds on rainfall, ph, and the nutrient targets, IQR on
        // temperature.
        let df = dataset::filter_at_most(&df, "rainfall", config.rainfall_bound)?;
        let df = dataset::filter_at_most(&df, "ph", config.ph_bound)?;
        let mut df = df;
        for target in TARGETS {
            df = dataset::filter_at_most(&df, target, config.nutrient_bound)?;
        }
        let df = dataset::filter_iqr(&df, "temperature")?;

        let spec = TransformSpec::new()
            .numeric("temperature")
            .numeric("rainfall")
            .label("soil_color")
            .numeric("ph")
            .label("crop");
        let (transform, matrix) = FittedTransform::fit(spec, &df)?;

        let mut y = Array2::zeros((df.height(), TARGETS.len()));
        for (t, target) in TARGETS.iter().enumerate() {
            let column = dataset::numeric_column(&df, target)?;
            for (i, value) in column.into_iter().enumerate() {
                y[[i, t]] = value.unwrap_or(0.0);
            }
        }

        let (train_idx, test_idx) = train_test_split(matrix.nrows(), config.test_ratio, config.params.seed)?;
        let x_train = matrix.select(Axis(0), &train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let x_test = matrix.select(Axis(0), &test_idx);
        let y_test = y.select(Axis(0), &test_idx);

        let model = MultiOutputForest::fit(&TARGETS, config.params, &x_train, &y_train)?;

        let predicted = model.predict(&x_test)?;
        let mut test_mse = [0.0; 3];
        for (t, target) in TARGETS.iter().enumerate() {
            let truth: Array1<f64> = y_test.column(t).to_owned();
            let pred: Array1<f64> = predicted.column(t).to_owned();
            test_mse[t] = mean_squared_error(&truth, &pred);
            info!(nutrient = target, mse = test_mse[t], "nutrient model: held-out evaluation");
        }

        Ok(Self { transform, model, test_mse })
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.transform.required_fields()
    }

    pub fn test_mse(&self) -> &[f64; 3] {
        &self.test_mse
    }

    /// Predict nutrient requirements for one raw record. Outputs map to
    /// named fields by the fixed target order.
    pub fn predict(&self, record: &FeatureRecord) -> Result<NutrientLevels> {
        record.require_fields(self.transform.required_fields())?;
        let vector = self.transform.apply(record)?;
        let outputs = self.model.predict_row(&vector.to_vec())?;
        Ok(NutrientLevels {
            nitrogen: outputs[0],
            phosphorus: outputs[1],
            potassium: outputs[2],
        })
    }
}
