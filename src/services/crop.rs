//! Crop suitability classification
//!
//! Predicts a suitable crop from temperature, rainfall, soil color, and
//! soil pH. Soil color is one-hot encoded (drop-first), so a soil color
//! never seen in training degrades to the all-zero block instead of
//! failing. The target crop label is label-encoded for the forest and
//! decoded back to its category string on predict.

use crate::dataset;
use crate::error::Result;
use crate::record::FeatureRecord;
use crate::training::{
    accuracy, train_test_split, ForestParamGrid, ForestParams, GridSearch, RandomForest, Task,
};
use crate::transform::{FittedTransform, LabelEncoder, TransformSpec};
use ndarray::{Array1, Axis};
use polars::prelude::DataFrame;
use tracing::info;

const FEATURES: [&str; 4] = ["temperature", "rainfall", "soil_color", "ph"];
const TARGET: &str = "crop";

/// Training-time knobs for the crop classifier.
#[derive(Debug, Clone)]
pub struct CropConfig {
    pub test_ratio: f64,
    pub cv_folds: usize,
    pub seed: u64,
    pub grid: ForestParamGrid,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            cv_folds: 5,
            seed: 42,
            grid: ForestParamGrid {
                n_estimators: vec![50, 100],
                max_depth: vec![None, Some(15), Some(25)],
                min_samples_split: vec![2, 5],
                min_samples_leaf: vec![1, 2],
            },
        }
    }
}

/// The fitted crop recommendation service.
pub struct CropService {
    transform: FittedTransform,
    target: LabelEncoder,
    model: RandomForest,
    test_accuracy: f64,
}

impl CropService {
    /// Fit with default configuration.
    pub fn fit(df: &DataFrame) -> Result<Self> {
        Self::fit_with(df, &CropConfig::default())
    }

    /// Clean the dataset, fit the transform, grid-search the forest, and
    /// evaluate on a held-out split. The reported accuracy never gates
    /// serving.
    pub fn fit_with(df: &DataFrame, config: &CropConfig) -> Result<Self> {
        let df = dataset::lowercase_columns(df)?;
        dataset::require_columns(&df, &[FEATURES[0], FEATURES[1], FEATURES[2], FEATURES[3], TARGET])?;
        let df = dataset::normalize_strings(&df, &["soil_color", TARGET])?;
        let df = dataset::drop_missing_in(&df, &["soil_color", TARGET])?;

        let spec = TransformSpec::new()
            .numeric("temperature")
            .numeric("rainfall")
            .one_hot("soil_color")
            .numeric("ph");
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
        let y_train = Array1::from_iter(train_idx.iter().map(|&i| y[i]));
        let x_test = matrix.select(Axis(0), &test_idx);
        let y_test = Array1::from_iter(test_idx.iter().map(|&i| y[i]));

        let outcome = GridSearch::new(config.cv_folds, config.seed).run(
            Task::Classification,
            &config.grid,
            &x_train,
            &y_train,
        )?;
        info!(
            n_estimators = outcome.params.n_estimators,
            max_depth = ?outcome.params.max_depth,
            min_samples_split = outcome.params.min_samples_split,
            min_samples_leaf = outcome.params.min_samples_leaf,
            cv_accuracy = outcome.cv_score,
            "crop model: best hyperparameters"
        );

        let mut model = RandomForest::new(Task::Classification, outcome.params);
        model.fit(&x_train, &y_train)?;

        let test_accuracy = accuracy(&y_test, &model.predict(&x_test)?);
        info!(
            accuracy = test_accuracy,
            n_train = x_train.nrows(),
            n_test = x_test.nrows(),
            n_classes = target.vocabulary().len(),
            "crop model: held-out evaluation"
        );

        Ok(Self {
            transform,
            target,
            model,
            test_accuracy,
        })
    }

    /// Fit a single-candidate model without grid search (used by tests
    /// and scripted training runs).
    pub fn fit_fixed(df: &DataFrame, params: ForestParams) -> Result<Self> {
        let config = CropConfig {
            grid: ForestParamGrid::single(params),
            cv_folds: 2,
            ..CropConfig::default()
        };
        Self::fit_with(df, &config)
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.transform.required_fields()
    }

    pub fn test_accuracy(&self) -> f64 {
        self.test_accuracy
    }

    /// Predict the crop for one raw record.
    pub fn predict(&self, record: &FeatureRecord) -> Result<String> {
        record.require_fields(self.transform.required_fields())?;
        let vector = self.transform.apply(record)?;
        let code = self.model.predict_row(&vector.to_vec())?;
        Ok(self.target.decode(code)?.to_string())
    }
}
