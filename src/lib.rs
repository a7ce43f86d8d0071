//! Agro Recommend - Agronomic recommendation services
//!
//! Three fitted models behind one HTTP API:
//! - crop recommendation (random forest classifier)
//! - soil nutrient requirements (multi-output random forest regressor)
//! - fertilizer recommendation (gradient-boosted classifier)
//!
//! Each model pairs a [`transform::FittedTransform`] with its estimator.
//! The transform is fitted once from the training frame and re-applied
//! per request through the same code path, so the serving-time feature
//! vector is bit-for-bit what the model saw during training.
//!
//! # Modules
//!
//! - [`dataset`] - CSV loading and frame-level cleaning
//! - [`record`] - Raw request records and field access
//! - [`transform`] - Imputation, encoding, scaling, the fitted pipeline
//! - [`training`] - Trees, forests, boosting, metrics, grid search
//! - [`services`] - The three fitted recommendation services
//! - [`server`] - HTTP server with REST API

pub mod error;

pub mod dataset;
pub mod record;
pub mod transform;

pub mod training;

pub mod services;

pub mod server;
