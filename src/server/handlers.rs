//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::record::FeatureRecord;
use crate::services::NutrientLevels;

use super::error::{Result, ServerError};
use super::state::AppState;

fn record_from_body(
    body: std::result::Result<Json<FeatureRecord>, JsonRejection>,
) -> Result<FeatureRecord> {
    let Json(record) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    Ok(record)
}

/// Recommend a crop for the given soil and climate conditions.
pub async fn predict_crop(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<FeatureRecord>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let record = record_from_body(body)?;
    let prediction = state.crop.predict(&record)?;
    info!(model = "crop", %prediction, "Prediction served");
    Ok(Json(json!({ "prediction": prediction })))
}

/// Predict required nutrient levels.
pub async fn predict_nutrients(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<FeatureRecord>, JsonRejection>,
) -> Result<Json<NutrientLevels>> {
    let record = record_from_body(body)?;
    let levels = state.nutrients.predict(&record)?;
    info!(
        model = "nutrients",
        nitrogen = levels.nitrogen,
        phosphorus = levels.phosphorus,
        potassium = levels.potassium,
        "Prediction served"
    );
    Ok(Json(levels))
}

/// Recommend a fertilizer product.
pub async fn predict_fertilizer(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<FeatureRecord>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let record = record_from_body(body)?;
    let prediction = state.fertilizer.predict(&record)?;
    info!(model = "fertilizer", %prediction, "Prediction served");
    Ok(Json(json!({ "prediction": prediction })))
}

/// Health check with per-model held-out metrics.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mse = state.nutrients.test_mse();
    Json(json!({
        "status": "healthy",
        "models": {
            "crop": { "test_accuracy": state.crop.test_accuracy() },
            "nutrients": {
                "test_mse": {
                    "nitrogen": mse[0],
                    "phosphorus": mse[1],
                    "potassium": mse[2],
                }
            },
            "fertilizer": { "test_accuracy": state.fertilizer.test_accuracy() },
        },
    }))
}
