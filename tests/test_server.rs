//! Integration test: Server API endpoints

use std::sync::Arc;

use agro_recommend::server::{create_router, AppState, ServerConfig};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use polars::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

/// A dataset covering every column the three services need, with the
/// capitalized headers the source CSVs carry.
fn training_frame() -> DataFrame {
    let crops = ["wheat", "rice", "maize"];
    let soils = ["black", "red", "brown"];
    let fertilizers = ["urea", "dap", "npk"];

    let mut temperature = Vec::new();
    let mut rainfall = Vec::new();
    let mut soil = Vec::new();
    let mut ph = Vec::new();
    let mut crop = Vec::new();
    let mut nitrogen = Vec::new();
    let mut phosphorus = Vec::new();
    let mut potassium = Vec::new();
    let mut fertilizer = Vec::new();
    for i in 0..60 {
        let c = i % 3;
        temperature.push(18.0 + c as f64 * 7.0 + (i % 5) as f64 * 0.4);
        rainfall.push(600.0 + c as f64 * 150.0 + i as f64);
        soil.push(soils[c]);
        ph.push(5.8 + c as f64 * 0.8 + (i % 3) as f64 * 0.05);
        crop.push(crops[c]);
        nitrogen.push(30.0 + c as f64 * 20.0 + (i % 4) as f64);
        phosphorus.push(25.0 + c as f64 * 15.0 + (i % 3) as f64);
        potassium.push(15.0 + c as f64 * 20.0 + (i % 5) as f64);
        fertilizer.push(fertilizers[c]);
    }
    DataFrame::new(vec![
        Series::new("Temperature".into(), temperature).into(),
        Series::new("Rainfall".into(), rainfall).into(),
        Series::new("Soil_color".into(), soil).into(),
        Series::new("pH".into(), ph).into(),
        Series::new("Crop".into(), crop).into(),
        Series::new("Nitrogen".into(), nitrogen).into(),
        Series::new("Phosphorus".into(), phosphorus).into(),
        Series::new("Potassium".into(), potassium).into(),
        Series::new("Fertilizer".into(), fertilizer).into(),
    ])
    .unwrap()
}

fn test_app() -> axum::Router {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        dataset_path: String::new(),
        cors_origin: None,
    };
    let state = Arc::new(AppState::fit(&training_frame()).unwrap());
    create_router(state, &config)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint_reports_models() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["models"]["crop"]["test_accuracy"].is_number());
    assert!(body["models"]["nutrients"]["test_mse"]["nitrogen"].is_number());
}

#[tokio::test]
async fn test_crop_predict_returns_label() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/crop/predict",
            json!({
                "temperature": 19.0,
                "rainfall": 610.0,
                "soil_color": "black",
                "ph": 5.85,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["prediction"], "wheat");
}

#[tokio::test]
async fn test_nutrients_predict_returns_original_keys() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/nutrients/predict",
            json!({
                "temperature": 25.5,
                "rainfall": 760.0,
                "soil_color": "red",
                "ph": 6.6,
                "crop": "rice",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["Nitrogen"].is_number());
    assert!(body["Phosphorus"].is_number());
    assert!(body["Potassium"].is_number());
}

#[tokio::test]
async fn test_fertilizer_predict_returns_label() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/fertilizer/predict",
            json!({
                "temperature": 32.5,
                "rainfall": 920.0,
                "soil_color": "brown",
                "ph": 7.4,
                "crop": "maize",
                "nitrogen": 71.0,
                "potassium": 56.0,
                "phosphorus": 56.0,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["prediction"], "npk");
}

#[tokio::test]
async fn test_missing_field_yields_named_400() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/crop/predict",
            json!({
                "temperature": 19.0,
                "rainfall": 610.0,
                "soil_color": "black",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("ph"), "message should name the field: {message}");
}

#[tokio::test]
async fn test_unknown_label_category_yields_named_400() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/nutrients/predict",
            json!({
                "temperature": 25.5,
                "rainfall": 760.0,
                "soil_color": "purple",
                "ph": 6.6,
                "crop": "rice",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("purple"), "message should name the value: {message}");
}

#[tokio::test]
async fn test_unseen_one_hot_category_still_predicts() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/crop/predict",
            json!({
                "temperature": 19.0,
                "rainfall": 610.0,
                "soil_color": "sandy",
                "ph": 5.85,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["prediction"].is_string());
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/crop/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_on_predict_route_is_405() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/crop/predict")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
