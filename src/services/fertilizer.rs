//! Fertilizer recommendation classification
//!
//! Recommends a fertilizer product from climate, soil color, crop, and
//! measured nutrient levels. Categorical features are one-hot encoded,
//! so an unseen soil color or crop degrades to an all-zero indicator
//! block instead of rejecting the request.

use crate::dataset;
use crate::error::Result;
use crate::record::FeatureRecord;
use crate::training::{accuracy, train_test_split, BoostedClassifier, BoostingParams};
use crate::transform::{FittedTransform, LabelEncoder, TransformSpec};
use ndarray::{Array1, Axis};
use polars::prelude::DataFrame;
use tracing::info;

const TARGET: &str = "fertilizer";

/// Training-time knobs for the fertilizer classifier.
#[derive(Debug, Clone)]
pub struct FertilizerConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub params: BoostingParams,
}

impl Default for FertilizerConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            params: BoostingParams::default(),
        }
    }
}

/// The fitted fertilizer recommendation service.
pub struct FertilizerService {
    transform: FittedTransform,
    target: LabelEncoder,
    model: BoostedClassifier,
    test_accuracy: f64,
}

impl FertilizerService {
    pub fn fit(df: &DataFrame) -> Result<Self> {
        Self::fit_with(df, &FertilizerConfig::default())
    }

    pub fn fit_with(df: &DataFrame, config: &FertilizerConfig) -> Result<Self> {
        let df = dataset::lowercase_columns(df)?;
        dataset::require_columns(
            &df,
            &["temperature", "rainfall", "soil_color", "ph", "crop",
              "nitrogen", "potassium", "phosphorus", TARGET],
        )?;
        let df = dataset::normalize_strings(&df, &["soil_color", "crop", TARGET])?;
        let df = dataset::drop_missing(&df)?;

        let spec = TransformSpec::new()
            .numeric("temperature")
            .numeric("rainfall")
            .one_hot("soil_color")
            .numeric("ph")
            .one_hot("crop")
            .numeric("nitrogen")
            .numeric("potassium")
            .numeric("phosphorus");
        let (transform, matrix) = FittedTransform::fit(spec, &df)?;

        let target = LabelEncoder::fit(&df, TARGET)?;
        let labels = df.column(TARGET)?.str()?.clone();
        let y: Array1<f64> = labels
            .into_iter()
            .map(|opt| target.encode(opt.unwrap_or_default()))
            .collect::<Result<Vec<f64>>>()?
            .into();

        let (train_idx, test_idx) = train_test_split(matrix.nrows(), config.test_ratio, config.seed)?;
        let x_train = matrix.select(Axis(0), &train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let x_test = matrix.select(Axis(0), &test_idx);
        let y_test = y.select(Axis(0), &test_idx);

        let mut model = BoostedClassifier::new(config.params);
        model.fit(&x_train, &y_train)?;

        let predicted = model.predict(&x_test)?;
        let test_accuracy = accuracy(&y_test, &predicted);
        info!(
            classes = model.n_classes(),
            accuracy = test_accuracy,
            "fertilizer model: held-out evaluation"
        );

        Ok(Self { transform, target, model, test_accuracy })
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.transform.required_fields()
    }

    pub fn test_accuracy(&self) -> f64 {
        self.test_accuracy
    }

    /// Recommend a fertilizer for one raw record, decoded back to its
    /// training-set label.
    pub fn predict(&self, record: &FeatureRecord) -> Result<String> {
        record.require_fields(self.transform.required_fields())?;
        let vector = self.transform.apply(record)?;
        let code = self.model.predict_row(&vector.to_vec())?;
        Ok(self.target.decode(code)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgroError;
    use polars::prelude::*;

    pub(crate) fn fertilizer_frame() -> DataFrame {
        let mut temperature = Vec::new();
        let mut rainfall = Vec::new();
        let mut soil = Vec::new();
        let mut ph = Vec::new();
        let mut crop = Vec::new();
        let mut nitrogen = Vec::new();
        let mut potassium = Vec::new();
        let mut phosphorus = Vec::new();
        let mut fertilizer = Vec::new();
        for i in 0..16 {
            let low = i % 2 == 0;
            temperature.push(if low { 21.0 + (i % 4) as f64 } else { 31.0 + (i % 4) as f64 });
            rainfall.push(if low { 650.0 + i as f64 } else { 980.0 + i as f64 });
            soil.push(if low { "black" } else { "red" });
            ph.push(if low { 6.2 } else { 7.1 });
            crop.push(if low { "wheat" } else { "rice" });
            nitrogen.push(if low { 35.0 } else { 75.0 });
            potassium.push(if low { 18.0 } else { 55.0 });
            phosphorus.push(if low { 28.0 } else { 50.0 });
            fertilizer.push(if low { "urea" } else { "dap" });
        }
        DataFrame::new(vec![
            Series::new("Temperature".into(), temperature).into(),
            Series::new("Rainfall".into(), rainfall).into(),
            Series::new("Soil_color".into(), soil).into(),
            Series::new("pH".into(), ph).into(),
            Series::new("Crop".into(), crop).into(),
            Series::new("Nitrogen".into(), nitrogen).into(),
            Series::new("Potassium".into(), potassium).into(),
            Series::new("Phosphorus".into(), phosphorus).into(),
            Series::new("Fertilizer".into(), fertilizer).into(),
        ])
        .unwrap()
    }

    fn fitted() -> FertilizerService {
        let config = FertilizerConfig {
            params: BoostingParams { n_estimators: 20, ..BoostingParams::default() },
            ..FertilizerConfig::default()
        };
        FertilizerService::fit_with(&fertilizer_frame(), &config).unwrap()
    }

    fn low_profile_record() -> FeatureRecord {
        FeatureRecord::new()
            .with_number("temperature", 22.0)
            .with_number("rainfall", 655.0)
            .with_text("soil_color", "black")
            .with_number("ph", 6.2)
            .with_text("crop", "wheat")
            .with_number("nitrogen", 35.0)
            .with_number("potassium", 18.0)
            .with_number("phosphorus", 28.0)
    }

    #[test]
    fn test_recommends_training_label() {
        let service = fitted();
        assert_eq!(service.predict(&low_profile_record()).unwrap(), "urea");
    }

    #[test]
    fn test_prediction_is_repeatable() {
        let service = fitted();
        let first = service.predict(&low_profile_record()).unwrap();
        let second = service.predict(&low_profile_record()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unseen_crop_degrades_instead_of_failing() {
        let service = fitted();
        let record = FeatureRecord::new()
            .with_number("temperature", 22.0)
            .with_number("rainfall", 655.0)
            .with_text("soil_color", "black")
            .with_number("ph", 6.2)
            .with_text("crop", "sorghum")
            .with_number("nitrogen", 35.0)
            .with_number("potassium", 18.0)
            .with_number("phosphorus", 28.0);

        let label = service.predict(&record).unwrap();
        assert!(label == "urea" || label == "dap");
    }

    #[test]
    fn test_missing_nutrient_field_is_client_error() {
        let service = fitted();
        let record = FeatureRecord::new()
            .with_number("temperature", 22.0)
            .with_number("rainfall", 655.0)
            .with_text("soil_color", "black")
            .with_number("ph", 6.2)
            .with_text("crop", "wheat")
            .with_number("potassium", 18.0)
            .with_number("phosphorus", 28.0);

        let err = service.predict(&record).unwrap_err();
        assert!(matches!(err, AgroError::MissingField(ref f) if f == "nitrogen"));
        assert!(err.is_client_input());
    }
}
