//! Recommendation services
//!
//! Three independently fitted model pipelines over the shared agronomic
//! dataset. Each service owns a [`FittedTransform`] and its paired trained
//! model; the two are created together at startup and never re-used with
//! mismatched counterparts. After `fit` returns, a service is immutable
//! and safe to share across request handlers without locking.
//!
//! [`FittedTransform`]: crate::transform::FittedTransform

mod crop;
mod fertilizer;
mod nutrients;

pub use crop::{CropConfig, CropService};
pub use fertilizer::{FertilizerConfig, FertilizerService};
pub use nutrients::{NutrientConfig, NutrientLevels, NutrientService};
