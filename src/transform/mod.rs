//! Feature transformation pipeline
//!
//! A stateful imputation → encoding → scaling pipeline, fitted once on
//! training data and re-applied identically to every inference request.
//! The fitted artifact records an explicit canonical column schema so that
//! training-time and serving-time vectors agree in length and order by
//! construction, not by incidental iteration order.

mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use encoder::{LabelEncoder, OneHotEncoder};
pub use imputer::MeanImputer;
pub use pipeline::{ColumnSpec, Encoding, FittedTransform, TransformSpec};
pub use scaler::StandardScaler;
